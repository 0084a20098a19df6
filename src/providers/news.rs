use crate::core::error::MalformedPayloadError;
use serde::{Deserialize, Serialize};

/// One headline from an RSS 2.0 `channel/item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<NewsItem>,
}

/// Extracts the `channel/item` list of an RSS feed, in feed order.
pub fn parse_news(body: &str) -> Result<Vec<NewsItem>, MalformedPayloadError> {
    let rss: Rss = quick_xml::de::from_str(body)
        .map_err(|e| MalformedPayloadError(format!("news feed is not RSS: {e}")))?;
    Ok(rss.channel.items)
}
