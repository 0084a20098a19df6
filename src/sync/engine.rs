use super::report::SyncReport;
use crate::core::config::{LogoPolicy, ProviderConfig, SyncConfig};
use crate::core::error::{StoreError, SyncFailure};
use crate::core::valuation::compute_valuation;
use crate::core::{Clock, StockRecord, StockStore, SystemClock};
use crate::providers::{LogoResolver, ProviderClient, parse_price};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Refreshes price, valuation and logo for tracked stocks.
///
/// Not reentrant: callers must not run two cycles over the same store at once.
/// The scheduler guarantees that for the periodic job.
pub struct StockSyncEngine {
    client: Arc<ProviderClient>,
    store: Arc<dyn StockStore>,
    logos: LogoResolver,
    price_url: String,
    api_key: String,
    concurrency: usize,
    logo_policy: LogoPolicy,
    clock: Arc<dyn Clock>,
}

impl StockSyncEngine {
    pub fn new(
        client: Arc<ProviderClient>,
        store: Arc<dyn StockStore>,
        provider: &ProviderConfig,
        sync: &SyncConfig,
    ) -> Self {
        let logos = LogoResolver::new(Arc::clone(&client), &provider.logo_url, &provider.api_key);
        Self {
            client,
            store,
            logos,
            price_url: provider.price_url.clone(),
            api_key: provider.api_key.clone(),
            concurrency: sync.concurrency.max(1),
            logo_policy: sync.logo_policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one sync cycle over every stored record.
    ///
    /// Per-symbol failures are collected in the report and the failed records are
    /// written back unchanged. Only a store failure aborts the cycle.
    pub async fn refresh_all(&self) -> Result<SyncReport, StoreError> {
        let started = Instant::now();
        let records = self.store.find_all().await?;
        info!(count = records.len(), "Starting stock sync cycle");

        let outcomes: Vec<(StockRecord, Result<StockRecord, SyncFailure>)> =
            stream::iter(records)
                .map(|record| async move {
                    let outcome = self.sync_record(&record).await;
                    (record, outcome)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = SyncReport::new(outcomes.len());
        let mut to_save = Vec::with_capacity(outcomes.len());
        for (original, outcome) in outcomes {
            match outcome {
                Ok(updated) => {
                    report.updated.push(updated.symbol.clone());
                    to_save.push(updated);
                }
                Err(failure) => {
                    error!(symbol = %failure.symbol, cause = %failure.cause, "Failed to sync stock");
                    report.failures.push(failure);
                    to_save.push(original);
                }
            }
        }

        self.store.save_all(to_save).await?;
        report.elapsed = started.elapsed();
        report.log_summary();
        Ok(report)
    }

    /// Syncs a single record and persists it on success.
    ///
    /// Used when a stock is first added, so nothing is written on failure.
    pub async fn refresh_one(&self, record: StockRecord) -> Result<StockRecord, SyncFailure> {
        info!(symbol = %record.symbol, "Syncing single stock");
        let updated = self.sync_record(&record).await?;
        let saved = self
            .store
            .save(updated)
            .await
            .map_err(|e| SyncFailure::new(&record.symbol, e))?;
        info!(
            symbol = %saved.symbol,
            close_price = %saved.close_price,
            current_value = %saved.current_value,
            "Synced stock"
        );
        Ok(saved)
    }

    /// Produces the next state of `record` without touching the store.
    ///
    /// Only the price step can fail; on failure `record` is left as it was.
    #[instrument(name = "SyncStock", skip(self, record), fields(symbol = %record.symbol))]
    async fn sync_record(&self, record: &StockRecord) -> Result<StockRecord, SyncFailure> {
        let symbol = record.symbol.as_str();

        let body = self
            .client
            .fetch(&self.price_url, symbol, &self.api_key)
            .await
            .map_err(|e| SyncFailure::new(symbol, e))?;
        let raw_price = parse_price(&body).map_err(|e| SyncFailure::new(symbol, e))?;
        debug!(%raw_price, "Price fetched");

        let valuation = compute_valuation(raw_price, record.shares_owned)
            .map_err(|e| SyncFailure::new(symbol, e))?;
        debug!(
            close_price = %valuation.close_price,
            current_value = %valuation.current_value,
            "Valuated"
        );

        let mut updated = record.clone();
        updated.close_price = valuation.close_price;
        updated.current_value = valuation.current_value;

        if self.logo_policy == LogoPolicy::SkipIfPresent && record.has_logo() {
            debug!("Keeping existing logo");
        } else {
            updated.logo_image = self.logos.resolve_logo(symbol).await;
        }

        updated.timestamp = Some(self.clock.now());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SyncError;
    use crate::providers::DEFAULT_LOGO;
    use crate::store::MemoryStockStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Advances one second on every read.
    struct StepClock {
        next: Mutex<DateTime<Utc>>,
    }

    impl StepClock {
        fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                next: Mutex::new(start),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + ChronoDuration::seconds(1);
            now
        }
    }

    struct BrokenStore;

    fn broken() -> StoreError {
        StoreError::Serialization(serde_json::from_str::<u8>("x").unwrap_err())
    }

    #[async_trait]
    impl StockStore for BrokenStore {
        async fn find_all(&self) -> Result<Vec<StockRecord>, StoreError> {
            Err(broken())
        }
        async fn find_by_symbol(&self, _: &str) -> Result<Option<StockRecord>, StoreError> {
            Err(broken())
        }
        async fn save(&self, _: StockRecord) -> Result<StockRecord, StoreError> {
            Err(broken())
        }
        async fn save_all(&self, _: Vec<StockRecord>) -> Result<Vec<StockRecord>, StoreError> {
            Err(broken())
        }
        async fn delete_by_symbol(&self, _: &str) -> Result<bool, StoreError> {
            Err(broken())
        }
    }

    /// Reads succeed; every write fails.
    struct ReadOnlyStore {
        inner: MemoryStockStore,
    }

    #[async_trait]
    impl StockStore for ReadOnlyStore {
        async fn find_all(&self) -> Result<Vec<StockRecord>, StoreError> {
            self.inner.find_all().await
        }
        async fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>, StoreError> {
            self.inner.find_by_symbol(symbol).await
        }
        async fn save(&self, _: StockRecord) -> Result<StockRecord, StoreError> {
            Err(broken())
        }
        async fn save_all(&self, _: Vec<StockRecord>) -> Result<Vec<StockRecord>, StoreError> {
            Err(broken())
        }
        async fn delete_by_symbol(&self, _: &str) -> Result<bool, StoreError> {
            Err(broken())
        }
    }

    fn provider_config(mock_server: &MockServer) -> ProviderConfig {
        let base = mock_server.uri();
        ProviderConfig {
            api_key: "k3y".to_string(),
            price_url: format!("{base}/price?symbol={{symbol}}&apikey={{apiKey}}"),
            logo_url: format!("{base}/logo?symbol={{symbol}}&apikey={{apiKey}}"),
            profile_url: format!("{base}/profile?symbol={{symbol}}&apikey={{apiKey}}"),
            previous_close_url: format!("{base}/prev/{{symbol}}?apiKey={{apiKey}}"),
            news_url: format!("{base}/rss/headline?s={{symbol}}"),
            timeout_secs: 2,
        }
    }

    fn engine(
        mock_server: &MockServer,
        store: Arc<dyn StockStore>,
        logo_policy: LogoPolicy,
    ) -> StockSyncEngine {
        let client = Arc::new(ProviderClient::new(std::time::Duration::from_secs(2)).unwrap());
        let sync = SyncConfig {
            concurrency: 2,
            logo_policy,
        };
        StockSyncEngine::new(client, store, &provider_config(mock_server), &sync)
    }

    async fn mount_price(mock_server: &MockServer, symbol: &str, price: &str) {
        Mock::given(method("GET"))
            .and(path("/price"))
            .and(query_param("symbol", symbol))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!(r#"{{"price":"{price}"}}"#)),
            )
            .mount(mock_server)
            .await;
    }

    async fn mount_price_error(mock_server: &MockServer, symbol: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/price"))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(status))
            .mount(mock_server)
            .await;
    }

    async fn mount_logo(mock_server: &MockServer, image: Vec<u8>) {
        let image_url = format!("{}/img/logo.png", mock_server.uri());
        Mock::given(method("GET"))
            .and(path("/logo"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!(r#"{{"url":"{image_url}"}}"#)),
            )
            .mount(mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(image))
            .mount(mock_server)
            .await;
    }

    fn previously_synced(symbol: &str, shares: i64, at: DateTime<Utc>) -> StockRecord {
        let mut record = StockRecord::new(symbol, shares);
        record.close_price = dec!(10.00);
        record.current_value = dec!(10.00) * rust_decimal::Decimal::from(shares);
        record.logo_image = vec![1, 2, 3];
        record.timestamp = Some(at);
        record
    }

    #[tokio::test]
    async fn test_refresh_one_fills_and_persists_record() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "AAPL", "150.005").await;
        mount_logo(&mock_server, vec![9, 9, 9]).await;

        let store = Arc::new(MemoryStockStore::new());
        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent);

        let saved = engine.refresh_one(StockRecord::new("AAPL", 10)).await.unwrap();
        assert!(saved.id.is_some());
        assert_eq!(saved.close_price, dec!(150.01));
        assert_eq!(saved.current_value, dec!(1500.10));
        assert_eq!(saved.logo_image, vec![9, 9, 9]);
        assert!(saved.timestamp.is_some());

        let found = store.find_by_symbol("AAPL").await.unwrap().unwrap();
        assert_eq!(found.symbol, saved.symbol);
        assert_eq!(found.close_price, saved.close_price);
        assert_eq!(found.current_value, saved.current_value);
        assert_eq!(found.shares_owned, saved.shares_owned);
    }

    #[tokio::test]
    async fn test_refresh_one_is_idempotent_with_later_timestamp() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "AAPL", "189.845").await;
        mount_logo(&mock_server, vec![4, 2]).await;

        let store = Arc::new(MemoryStockStore::new());
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap();
        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent)
            .with_clock(Arc::new(StepClock::starting_at(start)));

        let first = engine.refresh_one(StockRecord::new("AAPL", 7)).await.unwrap();
        let second = engine.refresh_one(first.clone()).await.unwrap();

        assert_eq!(first.close_price, dec!(189.85));
        assert_eq!(second.close_price, first.close_price);
        assert_eq!(second.current_value, first.current_value);
        assert_eq!(second.id, first.id);
        assert!(second.timestamp > first.timestamp);
    }

    #[tokio::test]
    async fn test_refresh_one_failure_persists_nothing() {
        let mock_server = MockServer::start().await;
        mount_price_error(&mock_server, "NOPE", 404).await;

        let store = Arc::new(MemoryStockStore::new());
        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent);

        let failure = engine
            .refresh_one(StockRecord::new("NOPE", 1))
            .await
            .unwrap_err();
        assert_eq!(failure.symbol, "NOPE");
        assert!(matches!(failure.cause, SyncError::Transport(_)));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_price_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"error"}"#))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStockStore::new());
        let engine = engine(&mock_server, store, LogoPolicy::SkipIfPresent);

        let failure = engine
            .refresh_one(StockRecord::new("AAPL", 1))
            .await
            .unwrap_err();
        assert!(matches!(failure.cause, SyncError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_failing_symbol() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "20.004").await;
        mount_price_error(&mock_server, "B", 503).await;
        mount_price(&mock_server, "C", "30.5").await;
        mount_logo(&mock_server, vec![5]).await;

        let before = Utc.with_ymd_and_hms(2026, 1, 5, 5, 0, 0).unwrap();
        let store = Arc::new(MemoryStockStore::new());
        for symbol in ["A", "B", "C"] {
            store.save(previously_synced(symbol, 2, before)).await.unwrap();
        }
        let b_before = store.find_by_symbol("B").await.unwrap().unwrap();

        let now = Utc.with_ymd_and_hms(2026, 1, 6, 5, 0, 0).unwrap();
        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent)
            .with_clock(Arc::new(StepClock::starting_at(now)));

        let report = engine.refresh_all().await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "B");
        let mut updated = report.updated.clone();
        updated.sort();
        assert_eq!(updated, vec!["A", "C"]);

        let a = store.find_by_symbol("A").await.unwrap().unwrap();
        assert_eq!(a.close_price, dec!(20.00));
        assert_eq!(a.current_value, dec!(40.00));
        assert!(a.timestamp.unwrap() >= now);

        let c = store.find_by_symbol("C").await.unwrap().unwrap();
        assert_eq!(c.close_price, dec!(30.50));
        assert_eq!(c.current_value, dec!(61.00));
        assert!(c.timestamp.unwrap() >= now);

        let b = store.find_by_symbol("B").await.unwrap().unwrap();
        assert_eq!(b, b_before);
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_overflowing_valuation() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "20.5").await;
        mount_price(&mock_server, "HUGE", "70000000000000000000000000000").await;
        mount_price(&mock_server, "C", "30").await;

        let before = Utc.with_ymd_and_hms(2026, 1, 5, 5, 0, 0).unwrap();
        let store = Arc::new(MemoryStockStore::new());
        for symbol in ["A", "HUGE", "C"] {
            store.save(previously_synced(symbol, 2, before)).await.unwrap();
        }
        let huge_before = store.find_by_symbol("HUGE").await.unwrap().unwrap();

        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent);
        let report = engine.refresh_all().await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "HUGE");
        assert!(matches!(report.failures[0].cause, SyncError::Valuation(_)));

        let a = store.find_by_symbol("A").await.unwrap().unwrap();
        assert_eq!(a.close_price.to_string(), "20.50");
        assert_eq!(a.current_value.to_string(), "41.00");
        let c = store.find_by_symbol("C").await.unwrap().unwrap();
        assert_eq!(c.close_price.to_string(), "30.00");
        assert_eq!(c.current_value.to_string(), "60.00");
        assert_eq!(store.find_by_symbol("HUGE").await.unwrap().unwrap(), huge_before);
    }

    #[tokio::test]
    async fn test_existing_logo_is_kept_when_skipping() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "1.00").await;
        Mock::given(method("GET"))
            .and(path("/logo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"url":""}"#))
            .expect(0)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStockStore::new());
        store
            .save(previously_synced("A", 1, Utc::now()))
            .await
            .unwrap();
        let engine = engine(&mock_server, store.clone(), LogoPolicy::SkipIfPresent);

        engine.refresh_all().await.unwrap();
        let a = store.find_by_symbol("A").await.unwrap().unwrap();
        assert_eq!(a.logo_image, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_always_refetch_replaces_logo() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "1.00").await;
        Mock::given(method("GET"))
            .and(path("/logo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"url":""}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStockStore::new());
        store
            .save(previously_synced("A", 1, Utc::now()))
            .await
            .unwrap();
        let engine = engine(&mock_server, store.clone(), LogoPolicy::AlwaysRefetch);

        engine.refresh_all().await.unwrap();
        let a = store.find_by_symbol("A").await.unwrap().unwrap();
        assert_eq!(a.logo_image, DEFAULT_LOGO);
    }

    #[tokio::test]
    async fn test_logo_failure_does_not_fail_sync() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "12.34").await;
        Mock::given(method("GET"))
            .and(path("/logo"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStockStore::new());
        let engine = engine(&mock_server, store, LogoPolicy::SkipIfPresent);

        let saved = engine.refresh_one(StockRecord::new("A", 1)).await.unwrap();
        assert_eq!(saved.close_price, dec!(12.34));
        assert_eq!(saved.logo_image, DEFAULT_LOGO);
    }

    #[tokio::test]
    async fn test_store_failure_is_cycle_fatal() {
        let mock_server = MockServer::start().await;
        let engine = engine(&mock_server, Arc::new(BrokenStore), LogoPolicy::SkipIfPresent);

        assert!(engine.refresh_all().await.is_err());
    }

    #[tokio::test]
    async fn test_batch_write_failure_is_cycle_fatal() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "5").await;

        let inner = MemoryStockStore::new();
        inner
            .save(previously_synced("A", 1, Utc::now()))
            .await
            .unwrap();
        let store = Arc::new(ReadOnlyStore {
            inner: inner.clone(),
        });
        let engine = engine(&mock_server, store, LogoPolicy::SkipIfPresent);

        let result = engine.refresh_all().await;
        assert!(result.is_err());
        // Nothing was committed: the stored record still has the old price.
        let a = inner.find_by_symbol("A").await.unwrap().unwrap();
        assert_eq!(a.close_price, dec!(10.00));
    }

    #[tokio::test]
    async fn test_refresh_one_surfaces_persistence_failure() {
        let mock_server = MockServer::start().await;
        mount_price(&mock_server, "A", "5").await;
        mount_logo(&mock_server, vec![1]).await;
        let engine = engine(&mock_server, Arc::new(BrokenStore), LogoPolicy::SkipIfPresent);

        let failure = engine.refresh_one(StockRecord::new("A", 1)).await.unwrap_err();
        assert!(matches!(failure.cause, SyncError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_empty_store_cycle() {
        let mock_server = MockServer::start().await;
        let engine = engine(
            &mock_server,
            Arc::new(MemoryStockStore::new()),
            LogoPolicy::SkipIfPresent,
        );

        let report = engine.refresh_all().await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.updated.is_empty());
        assert!(report.failures.is_empty());
    }
}
