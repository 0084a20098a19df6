use crate::core::config::{API_KEY_PLACEHOLDER, SYMBOL_PLACEHOLDER};
use crate::core::error::TransportError;
use std::time::Duration;
use tracing::{debug, instrument};

/// Thin GET capability over the configured provider endpoints.
///
/// Every request is bounded by the timeout given at construction. There is no
/// retry here; the next sync cycle is the retry.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("bullrun/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Substitutes `{symbol}` and `{apiKey}` verbatim.
    pub fn render(template: &str, symbol: &str, api_key: &str) -> String {
        template
            .replace(SYMBOL_PLACEHOLDER, symbol)
            .replace(API_KEY_PLACEHOLDER, api_key)
    }

    /// Fetches the body of a templated endpoint as text.
    #[instrument(name = "ProviderFetch", skip(self, template, api_key), fields(symbol = %symbol))]
    pub async fn fetch(
        &self,
        template: &str,
        symbol: &str,
        api_key: &str,
    ) -> Result<String, TransportError> {
        let url = Self::render(template, symbol, api_key);
        // Keep the key out of errors and logs.
        let endpoint = template.replace(SYMBOL_PLACEHOLDER, symbol);
        debug!("Requesting {}", endpoint);

        let response = self.get(&url, &endpoint).await?;
        response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, &endpoint))
    }

    /// Downloads raw bytes from an absolute URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        debug!("Downloading {}", url);
        let response = self.get(url, url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, url))?;
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &str, endpoint: &str) -> Result<reqwest::Response, TransportError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn map_reqwest_error(error: reqwest::Error, endpoint: &str) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        TransportError::Request {
            endpoint: endpoint.to_string(),
            source: error.without_url(),
        }
    }
}
