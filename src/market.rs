//! Read-only provider lookups that bypass the store

use crate::core::config::ProviderConfig;
use crate::core::error::SyncError;
use crate::core::valuation::format_price;
use crate::providers::{NewsItem, ProviderClient, parse_news, parse_price};
use clap::ValueEnum;
use futures::future::join_all;
use tracing::debug;

/// Symbols shown by the index overview: Dow Jones, S&P 500 and Nasdaq Composite.
pub const INDEX_SYMBOLS: [&str; 3] = ["DJI", "SPX", "IXIC"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Endpoint {
    Price,
    Logo,
    Profile,
    PreviousClose,
}

impl Endpoint {
    fn template(self, provider: &ProviderConfig) -> &str {
        match self {
            Endpoint::Price => &provider.price_url,
            Endpoint::Logo => &provider.logo_url,
            Endpoint::Profile => &provider.profile_url,
            Endpoint::PreviousClose => &provider.previous_close_url,
        }
    }
}

/// Returns the provider's response body for `symbol` unchanged.
pub async fn fetch_raw(
    client: &ProviderClient,
    provider: &ProviderConfig,
    endpoint: Endpoint,
    symbol: &str,
) -> Result<String, SyncError> {
    debug!(?endpoint, symbol, "Fetching raw provider data");
    Ok(client
        .fetch(endpoint.template(provider), symbol, &provider.api_key)
        .await?)
}

/// Headlines for `symbol` from the configured RSS feed, newest first as the feed orders them.
pub async fn fetch_news(
    client: &ProviderClient,
    provider: &ProviderConfig,
    symbol: &str,
) -> Result<Vec<NewsItem>, SyncError> {
    let body = client
        .fetch(&provider.news_url, symbol, &provider.api_key)
        .await?;
    let items = parse_news(&body)?;
    debug!(symbol, count = items.len(), "Fetched headlines");
    Ok(items)
}

#[derive(Debug)]
pub struct IndexPrice {
    pub symbol: &'static str,
    /// `#,##0.00` formatted price, or the reason it is missing
    pub price: Result<String, SyncError>,
}

/// Fetches every index in [`INDEX_SYMBOLS`] concurrently; one failing index does
/// not hide the others.
pub async fn fetch_index_prices(
    client: &ProviderClient,
    provider: &ProviderConfig,
) -> Vec<IndexPrice> {
    let futures = INDEX_SYMBOLS.into_iter().map(|symbol| async move {
        let price = async {
            let body = client
                .fetch(&provider.price_url, symbol, &provider.api_key)
                .await?;
            Ok::<_, SyncError>(format_price(parse_price(&body)?))
        }
        .await;
        IndexPrice { symbol, price }
    });
    join_all(futures).await
}
