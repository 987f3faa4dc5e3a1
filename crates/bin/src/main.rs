//! Fundamentals CLI binary.
//!
//! Imports SEC filings and reconciles XBRL company facts into a local
//! SQLite metric store. Results are printed to stdout as JSON; logs go to
//! stderr.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fundamentals::{
    CikDirectory, DataError, EdgarProvider, Reconciler, ReconcilerConfig, SqliteStore, Symbol,
};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Placeholder user agent for commands that only read the local store.
const OFFLINE_USER_AGENT: &str = concat!("fundamentals/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "fundamentals")]
#[command(about = "Reconcile SEC XBRL company facts into a metric store", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "FUNDAMENTALS_DB", default_value = "fundamentals.db")]
    db: PathBuf,

    /// User agent sent to SEC EDGAR, e.g. "Acme Research admin@acme.com".
    /// SEC refuses requests without a contact address; required by commands
    /// that fetch from EDGAR.
    #[arg(long, global = true, env = "FUNDAMENTALS_USER_AGENT")]
    user_agent: Option<String>,

    /// JSON file mapping ticker symbols to CIKs
    #[arg(long, global = true, env = "FUNDAMENTALS_CIK_MAP")]
    cik_map: Option<PathBuf>,

    /// Maximum number of companies reconciled at once
    #[arg(long, global = true, default_value = "4")]
    concurrency: usize,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile annual-report metrics for one or more companies
    Reconcile {
        /// Ticker symbols
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// List the most recent annual-report filings without storing them
    Recent {
        /// Ticker symbol
        symbol: String,

        /// Maximum number of filings to list
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Store annual-report filings not yet known
    ImportFilings {
        /// Ticker symbol
        symbol: String,
    },

    /// List stored filings, newest first
    Filings {
        /// Ticker symbol
        symbol: String,
    },

    /// List stored metric series
    Metrics {
        /// Ticker symbol
        symbol: String,
    },
}

impl Commands {
    /// Returns true if the command only reads the local store.
    const fn is_offline(&self) -> bool {
        matches!(self, Self::Filings { .. } | Self::Metrics { .. })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs the command; returns `Ok(false)` when some but not all work failed.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let reconciler = build_reconciler(&cli)?;

    match cli.command {
        Commands::Reconcile { symbols } => {
            let symbols: Vec<Symbol> = symbols.iter().map(|s| Symbol::new(s.as_str())).collect();
            let results = reconciler.reconcile_many(&symbols).await;

            let mut all_ok = true;
            let output: Vec<_> = results
                .into_iter()
                .map(|(symbol, result)| match result {
                    Ok(summary) => json!(summary),
                    Err(e) => {
                        all_ok = false;
                        json!({"symbol": symbol, "status": "error", "error": e.to_string()})
                    }
                })
                .collect();

            print_json(&output)?;
            Ok(all_ok)
        }
        Commands::Recent { symbol, limit } => {
            let filings = reconciler.recent_filings(&Symbol::new(symbol), limit).await?;
            print_json(&json!({"recent": filings}))?;
            Ok(true)
        }
        Commands::ImportFilings { symbol } => {
            let summary = reconciler.import_filings(&Symbol::new(symbol)).await?;
            print_json(&summary)?;
            Ok(true)
        }
        Commands::Filings { symbol } => {
            let symbol = Symbol::new(symbol);
            let company = reconciler.company(&symbol)?;
            let filings = reconciler.filings(&symbol)?;
            print_json(&json!({"company": company, "filings": filings}))?;
            Ok(true)
        }
        Commands::Metrics { symbol } => {
            let symbol = Symbol::new(symbol);
            let company = reconciler.company(&symbol)?;
            let metrics: Vec<_> = reconciler
                .metrics(&symbol)?
                .into_iter()
                .map(|series| {
                    json!({
                        "key": series.metric.key,
                        "unit": series.metric.unit,
                        "points": series.points.iter().map(|p| json!({
                            "periodEnd": p.period_end,
                            "filedAt": p.filed_at,
                            "value": p.value,
                            "sourceFilingId": p.source_filing_id,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            print_json(&json!({"company": company, "metrics": metrics}))?;
            Ok(true)
        }
    }
}

fn build_reconciler(cli: &Cli) -> Result<Reconciler, Box<dyn std::error::Error>> {
    let ciks = match &cli.cik_map {
        Some(path) => {
            let ciks = CikDirectory::from_path(path)?;
            debug!(entries = ciks.len(), path = %path.display(), "Loaded CIK map");
            ciks
        }
        None => CikDirectory::new(),
    };

    let config = ReconcilerConfig::default()
        .with_ciks(ciks)
        .with_concurrency(cli.concurrency);

    let provider = edgar_provider(cli)?;
    info!(db = %cli.db.display(), "Opening metric store");
    let store = SqliteStore::new(&cli.db)?;

    Ok(Reconciler::new(Arc::new(provider), Arc::new(store)).with_config(config))
}

fn edgar_provider(cli: &Cli) -> fundamentals::Result<EdgarProvider> {
    match cli.user_agent.as_deref() {
        Some(user_agent) => EdgarProvider::new(user_agent),
        None if cli.command.is_offline() => EdgarProvider::new(OFFLINE_USER_AGENT),
        None => Err(DataError::InvalidParameter(
            "SEC EDGAR requires a user agent with a contact address; \
             set --user-agent or FUNDAMENTALS_USER_AGENT"
                .to_string(),
        )),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
