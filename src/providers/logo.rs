use super::client::ProviderClient;
use crate::core::error::TransportError;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Bundled image used whenever a provider logo cannot be resolved.
pub const DEFAULT_LOGO: &[u8] = include_bytes!("../../assets/default_logo.png");

#[derive(Debug, Deserialize)]
struct LogoResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Reason a provider logo was replaced by [`DEFAULT_LOGO`]. Only ever logged.
#[derive(Debug, Error)]
enum LogoFallback {
    #[error("logo metadata request failed: {0}")]
    Metadata(TransportError),
    #[error("logo metadata is not JSON: {0}")]
    Unparseable(serde_json::Error),
    #[error("logo metadata has no url")]
    MissingUrl,
    #[error("logo download failed: {0}")]
    Download(TransportError),
    #[error("logo download returned no bytes")]
    EmptyImage,
}

pub struct LogoResolver {
    client: Arc<ProviderClient>,
    template: String,
    api_key: String,
}

impl LogoResolver {
    pub fn new(client: Arc<ProviderClient>, template: &str, api_key: &str) -> Self {
        Self {
            client,
            template: template.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Returns the provider's logo for `symbol`, or the bundled default.
    ///
    /// Never fails: every problem along metadata fetch, url extraction and
    /// image download degrades to [`DEFAULT_LOGO`] with a warning.
    #[instrument(name = "ResolveLogo", skip(self), fields(symbol = %symbol))]
    pub async fn resolve_logo(&self, symbol: &str) -> Vec<u8> {
        match self.fetch_logo(symbol).await {
            Ok(image) => {
                debug!(bytes = image.len(), "Resolved provider logo");
                image
            }
            Err(reason) => {
                warn!(symbol = %symbol, reason = %reason, "Using default logo");
                DEFAULT_LOGO.to_vec()
            }
        }
    }

    async fn fetch_logo(&self, symbol: &str) -> Result<Vec<u8>, LogoFallback> {
        let body = self
            .client
            .fetch(&self.template, symbol, &self.api_key)
            .await
            .map_err(LogoFallback::Metadata)?;

        let metadata: LogoResponse =
            serde_json::from_str(&body).map_err(LogoFallback::Unparseable)?;
        let url = metadata
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(LogoFallback::MissingUrl)?;

        let image = self
            .client
            .download(&url)
            .await
            .map_err(LogoFallback::Download)?;
        if image.is_empty() {
            return Err(LogoFallback::EmptyImage);
        }
        Ok(image)
    }
}
