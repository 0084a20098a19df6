//! Stock snapshot record and the storage abstraction it lives behind

use crate::core::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The unit of synchronization: one tracked symbol and its last known valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Assigned by the store on first save.
    pub id: Option<String>,
    pub symbol: String,
    pub close_price: Decimal,
    pub shares_owned: i64,
    pub current_value: Decimal,
    #[serde(with = "base64_bytes", default)]
    pub logo_image: Vec<u8>,
    /// Last successful sync, `None` until the first one.
    pub timestamp: Option<DateTime<Utc>>,
}

impl StockRecord {
    /// A not-yet-synced record as supplied by the add-stock path.
    pub fn new(symbol: impl Into<String>, shares_owned: i64) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            close_price: Decimal::ZERO,
            shares_owned,
            current_value: Decimal::ZERO,
            logo_image: Vec::new(),
            timestamp: None,
        }
    }

    pub fn has_logo(&self) -> bool {
        !self.logo_image.is_empty()
    }
}

/// Keyed persistence for [`StockRecord`]s. `symbol` is the business key.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<StockRecord>, StoreError>;

    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>, StoreError>;

    /// Upserts a single record, assigning an id if it has none.
    async fn save(&self, record: StockRecord) -> Result<StockRecord, StoreError>;

    /// Upserts all records as one write.
    async fn save_all(&self, records: Vec<StockRecord>) -> Result<Vec<StockRecord>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_by_symbol(&self, symbol: &str) -> Result<bool, StoreError>;
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
