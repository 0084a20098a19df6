use crate::core::error::StoreError;
use crate::core::stock::{StockRecord, StockStore};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const STOCKS_PARTITION: &str = "stocks";

/// Stock store persisted in a fjall keyspace. Records are JSON values keyed by symbol.
pub struct DiskStockStore {
    keyspace: Keyspace,
    stocks: PartitionHandle,
}

impl DiskStockStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let keyspace = Config::new(path).open()?;
        let stocks = keyspace.open_partition(STOCKS_PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened stock store at {}", path.display());
        Ok(Self { keyspace, stocks })
    }

    fn decode(bytes: &[u8]) -> Result<StockRecord, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[async_trait]
impl StockStore for DiskStockStore {
    async fn find_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        let mut records = Vec::new();
        for item in self.stocks.iter() {
            let (_key, value) = item?;
            records.push(Self::decode(&value)?);
        }
        Ok(records)
    }

    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>, StoreError> {
        match self.stocks.get(symbol.as_bytes())? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: StockRecord) -> Result<StockRecord, StoreError> {
        let record = super::with_id(record);
        self.stocks
            .insert(record.symbol.as_bytes(), serde_json::to_vec(&record)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store PUT for symbol: {}", record.symbol);
        Ok(record)
    }

    async fn save_all(&self, records: Vec<StockRecord>) -> Result<Vec<StockRecord>, StoreError> {
        let records: Vec<StockRecord> = records.into_iter().map(super::with_id).collect();
        let mut batch = self.keyspace.batch();
        for record in &records {
            batch.insert(
                &self.stocks,
                record.symbol.as_bytes(),
                serde_json::to_vec(record)?,
            );
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store PUT for {} records", records.len());
        Ok(records)
    }

    async fn delete_by_symbol(&self, symbol: &str) -> Result<bool, StoreError> {
        if !self.stocks.contains_key(symbol.as_bytes())? {
            return Ok(false);
        }
        self.stocks.remove(symbol.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store REMOVE for symbol: {}", symbol);
        Ok(true)
    }
}
