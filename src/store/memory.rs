use crate::core::error::StoreError;
use crate::core::stock::{StockRecord, StockStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory stock store keyed by symbol
#[derive(Clone, Default)]
pub struct MemoryStockStore {
    inner: Arc<Mutex<BTreeMap<String, StockRecord>>>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn find_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        let records = self.inner.lock().await;
        Ok(records.values().cloned().collect())
    }

    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>, StoreError> {
        let records = self.inner.lock().await;
        Ok(records.get(symbol).cloned())
    }

    async fn save(&self, record: StockRecord) -> Result<StockRecord, StoreError> {
        let record = super::with_id(record);
        let mut records = self.inner.lock().await;
        debug!("Store PUT for symbol: {}", record.symbol);
        records.insert(record.symbol.clone(), record.clone());
        Ok(record)
    }

    async fn save_all(&self, records: Vec<StockRecord>) -> Result<Vec<StockRecord>, StoreError> {
        let records: Vec<StockRecord> = records.into_iter().map(super::with_id).collect();
        let mut stored = self.inner.lock().await;
        for record in &records {
            stored.insert(record.symbol.clone(), record.clone());
        }
        debug!("Store PUT for {} records", records.len());
        Ok(records)
    }

    async fn delete_by_symbol(&self, symbol: &str) -> Result<bool, StoreError> {
        let mut records = self.inner.lock().await;
        debug!("Store REMOVE for symbol: {}", symbol);
        Ok(records.remove(symbol).is_some())
    }
}
