use anyhow::Result;
use bullrun::core::log::init_logging;
use bullrun::market::Endpoint;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for bullrun::AppCommand {
    fn from(cmd: Commands) -> bullrun::AppCommand {
        match cmd {
            Commands::Add { symbol, shares } => bullrun::AppCommand::Add { symbol, shares },
            Commands::Shares { symbol, shares } => bullrun::AppCommand::Shares { symbol, shares },
            Commands::Remove { symbol } => bullrun::AppCommand::Remove { symbol },
            Commands::List => bullrun::AppCommand::List,
            Commands::Sync => bullrun::AppCommand::Sync,
            Commands::Daemon => bullrun::AppCommand::Daemon,
            Commands::Quote { symbol, endpoint } => bullrun::AppCommand::Quote { symbol, endpoint },
            Commands::Indices => bullrun::AppCommand::Indices,
            Commands::News { symbol } => bullrun::AppCommand::News { symbol },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Start tracking a stock and fetch its price and logo
    Add {
        symbol: String,
        #[arg(allow_negative_numbers = true)]
        shares: i64,
    },
    /// Change the number of shares held for a tracked stock
    Shares {
        symbol: String,
        #[arg(allow_negative_numbers = true)]
        shares: i64,
    },
    /// Stop tracking a stock
    Remove { symbol: String },
    /// Show tracked stocks with their last synced values
    List,
    /// Refresh every tracked stock once
    Sync,
    /// Refresh tracked stocks on the configured schedule until interrupted
    Daemon,
    /// Print a provider response for a symbol
    Quote {
        symbol: String,
        #[arg(short, long, value_enum, default_value_t = Endpoint::Price)]
        endpoint: Endpoint,
    },
    /// Show the major US index prices
    Indices,
    /// Show recent headlines for a symbol
    News { symbol: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => bullrun::cli::setup::setup(),
        Some(cmd) => bullrun::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
