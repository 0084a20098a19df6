//! Tracked-stock management: the write boundary in front of the store

use crate::core::error::ServiceError;
use crate::core::valuation::compute_valuation;
use crate::core::{StockRecord, StockStore};
use crate::sync::StockSyncEngine;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StockService {
    store: Arc<dyn StockStore>,
    engine: Arc<StockSyncEngine>,
}

impl StockService {
    pub fn new(store: Arc<dyn StockStore>, engine: Arc<StockSyncEngine>) -> Self {
        Self { store, engine }
    }

    pub async fn list(&self) -> Result<Vec<StockRecord>, ServiceError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get(&self, symbol: &str) -> Result<Option<StockRecord>, ServiceError> {
        Ok(self.store.find_by_symbol(&normalize_symbol(symbol)).await?)
    }

    /// Starts tracking `symbol`. The record is synced before it is first stored,
    /// so a symbol the provider cannot price is never added.
    pub async fn add_stock(
        &self,
        symbol: &str,
        shares_owned: i64,
    ) -> Result<StockRecord, ServiceError> {
        let symbol = validate_symbol(symbol)?;
        validate_shares(shares_owned)?;
        if self.store.find_by_symbol(&symbol).await?.is_some() {
            return Err(ServiceError::AlreadyTracked(symbol));
        }

        let record = self
            .engine
            .refresh_one(StockRecord::new(symbol, shares_owned))
            .await?;
        info!(symbol = %record.symbol, shares = record.shares_owned, "Added stock");
        Ok(record)
    }

    /// Changes the position size and revalues it at the last known close price.
    /// The sync timestamp is left alone since no price was fetched.
    pub async fn update_shares(
        &self,
        symbol: &str,
        shares_owned: i64,
    ) -> Result<StockRecord, ServiceError> {
        validate_shares(shares_owned)?;
        let symbol = normalize_symbol(symbol);
        let mut record = self
            .store
            .find_by_symbol(&symbol)
            .await?
            .ok_or(ServiceError::NotFound(symbol))?;

        record.shares_owned = shares_owned;
        record.current_value = compute_valuation(record.close_price, shares_owned)?.current_value;
        let saved = self.store.save(record).await?;
        info!(symbol = %saved.symbol, shares = shares_owned, "Updated shares");
        Ok(saved)
    }

    /// Returns whether the symbol was tracked.
    pub async fn delete_stock(&self, symbol: &str) -> Result<bool, ServiceError> {
        let symbol = normalize_symbol(symbol);
        let deleted = self.store.delete_by_symbol(&symbol).await?;
        if deleted {
            info!(symbol = %symbol, "Deleted stock");
        } else {
            warn!(symbol = %symbol, "Stock not found");
        }
        Ok(deleted)
    }
}

/// Tickers are stored upper-case so `aapl` and `AAPL` are the same record.
fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn validate_symbol(symbol: &str) -> Result<String, ServiceError> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(ServiceError::EmptySymbol);
    }
    Ok(symbol)
}

fn validate_shares(shares_owned: i64) -> Result<(), ServiceError> {
    if shares_owned < 0 {
        return Err(ServiceError::NegativeShares(shares_owned));
    }
    Ok(())
}
