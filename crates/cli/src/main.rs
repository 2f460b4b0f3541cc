use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scanner_core::*;
use scanner_data::CsvInstrumentClient;
use scanner_engine::Scanner;
use scanner_exchange::{BybitClient, BybitConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "scanner")]
#[command(about = "Bybit signal scanner: screen the instrument universe for entry conditions")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve instruments from `<SYMBOL>.csv` files in this directory instead of Bybit
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the Bybit testnet
    #[arg(long)]
    testnet: bool,

    /// Bybit API key
    #[arg(long, env = "BYBIT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Bybit API secret
    #[arg(long, env = "BYBIT_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every instrument and print the matches
    Scan {
        /// Only scan the first N discovered instruments
        #[arg(long)]
        max_instruments: Option<usize>,

        /// Predicate to apply (momentum_crossover, simple_breakout)
        #[arg(short, long)]
        predicate: Option<PredicateVariant>,

        /// Instruments processed at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Evaluate a single instrument
    Analyze {
        /// Instrument symbol (e.g. "BTCUSDT")
        symbol: String,

        #[arg(short, long)]
        predicate: Option<PredicateVariant>,
    },

    /// Start the API server
    Server {
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0:3000")]
        bind: String,
    },

    /// List available predicates
    Predicates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Scan {
            max_instruments,
            predicate,
            concurrency,
        } => {
            if max_instruments.is_some() {
                config.max_instruments = max_instruments;
            }
            if let Some(variant) = predicate {
                config.predicate.variant = variant;
            }
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            let scanner = build_scanner(config, cli.data_dir)?;
            let result = scanner.scan().await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Analyze { symbol, predicate } => {
            if let Some(variant) = predicate {
                config.predicate.variant = variant;
            }
            let scanner = build_scanner(config, cli.data_dir)?;
            let analysis = scanner
                .analyze(&symbol)
                .await
                .with_context(|| format!("Failed to analyze {}", symbol))?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Server { bind } => {
            let scanner = build_scanner(config, cli.data_dir)?;
            scanner_api::start_server(Arc::new(scanner), &bind).await?;
        }
        Commands::Predicates => {
            println!("Available predicates:");
            println!("  momentum_crossover - RSI below threshold, MACD above signal, close above MA, volume above average");
            println!("  simple_breakout    - Volume above average and close above the previous close");
        }
    }

    Ok(())
}

/// File configuration, with command-line and environment overrides applied.
fn load_config(cli: &Cli) -> Result<ScannerConfig> {
    let mut config = match &cli.config {
        Some(path) => ScannerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScannerConfig::default(),
    };

    if cli.testnet {
        config.testnet = true;
    }
    let credentials = Credentials::new(cli.api_key.clone(), cli.api_secret.clone());
    if credentials.is_present() {
        config.credentials = credentials;
    }

    Ok(config)
}

fn build_scanner(config: ScannerConfig, data_dir: Option<PathBuf>) -> Result<Scanner> {
    config.validate()?;

    let client: Arc<dyn InstrumentClient> = match data_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Serving instruments from CSV files");
            Arc::new(CsvInstrumentClient::new(dir))
        }
        None => Arc::new(BybitClient::new(BybitConfig::from_scanner_config(&config))?),
    };

    let predicate = scanner_signals::build_predicate(&config.predicate);
    tracing::info!(
        predicate = predicate.name(),
        category = %config.category,
        interval = %config.interval,
        "Scanner configured"
    );
    Ok(Scanner::new(client, config, predicate))
}
