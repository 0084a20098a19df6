pub mod cli;
pub mod core;
pub mod market;
pub mod providers;
pub mod stocks;
pub mod store;
pub mod sync;

use crate::core::config::AppConfig;
use crate::core::StockStore;
use crate::market::Endpoint;
use crate::providers::ProviderClient;
use crate::stocks::StockService;
use crate::store::DiskStockStore;
use crate::sync::{Schedule, Scheduler, StockSyncEngine};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Add { symbol: String, shares: i64 },
    Shares { symbol: String, shares: i64 },
    Remove { symbol: String },
    List,
    Sync,
    Daemon,
    Quote { symbol: String, endpoint: Endpoint },
    Indices,
    News { symbol: String },
}

/// Wired-up collaborators for one process.
pub struct App {
    pub config: AppConfig,
    pub client: Arc<ProviderClient>,
    pub engine: Arc<StockSyncEngine>,
    pub stocks: StockService,
}

impl App {
    /// Opens the on-disk store under the configured data directory.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?.join("stocks");
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        let store = DiskStockStore::open(&data_dir)
            .with_context(|| format!("Failed to open stock store at {}", data_dir.display()))?;
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn StockStore>) -> Result<Self> {
        let client = Arc::new(
            ProviderClient::new(config.provider.timeout())
                .context("Failed to build provider HTTP client")?,
        );
        let engine = Arc::new(StockSyncEngine::new(
            Arc::clone(&client),
            Arc::clone(&store),
            &config.provider,
            &config.sync,
        ));
        let stocks = StockService::new(store, Arc::clone(&engine));
        Ok(Self {
            config,
            client,
            engine,
            stocks,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("bullrun starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::from_config(config)?;
    execute(&app, command).await
}

pub async fn execute(app: &App, command: AppCommand) -> Result<()> {
    match command {
        AppCommand::Add { symbol, shares } => {
            let record = app.stocks.add_stock(&symbol, shares).await?;
            println!("{}", cli::stocks::display_stocks(std::slice::from_ref(&record)));
        }
        AppCommand::Shares { symbol, shares } => {
            let record = app.stocks.update_shares(&symbol, shares).await?;
            println!("{}", cli::stocks::display_stocks(std::slice::from_ref(&record)));
        }
        AppCommand::Remove { symbol } => {
            if !app.stocks.delete_stock(&symbol).await? {
                anyhow::bail!("{} is not tracked", symbol.trim());
            }
            println!("Removed {}", symbol.trim());
        }
        AppCommand::List => {
            let records = app.stocks.list().await?;
            println!("{}", cli::stocks::display_stocks(&records));
        }
        AppCommand::Sync => {
            let spinner = cli::ui::new_spinner("Syncing stocks...");
            let result = app.engine.refresh_all().await;
            spinner.finish_and_clear();
            let report = result.context("Stock sync cycle failed")?;
            println!("{}", cli::stocks::display_report(&report));
        }
        AppCommand::Daemon => {
            let schedule = Schedule::from_config(&app.config.schedule)?;
            let scheduler = Scheduler::new(
                Arc::clone(&app.engine),
                schedule,
                app.config.schedule.run_on_start,
            );
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for shutdown signal");
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
        }
        AppCommand::Quote { symbol, endpoint } => {
            let body = market::fetch_raw(&app.client, &app.config.provider, endpoint, &symbol)
                .await
                .with_context(|| format!("Failed to fetch {endpoint:?} for {symbol}"))?;
            println!("{body}");
        }
        AppCommand::Indices => {
            let prices = market::fetch_index_prices(&app.client, &app.config.provider).await;
            println!("{}", cli::stocks::display_indices(&prices));
        }
        AppCommand::News { symbol } => {
            let items = market::fetch_news(&app.client, &app.config.provider, symbol.trim())
                .await
                .with_context(|| format!("Failed to fetch news for {symbol}"))?;
            println!("{}", cli::stocks::display_news(&items));
        }
    }
    Ok(())
}
