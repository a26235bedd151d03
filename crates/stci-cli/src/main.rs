mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stci")]
#[command(author, version, about = "Standard Token Cost Index - daily LLM pricing pipeline")]
struct Cli {
    #[arg(short = 'd', long, help = "Data directory (default: ./data)")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = StorageKind::Filesystem, help = "Storage backend")]
    storage: StorageKind,

    #[arg(long, help = "SQLite database path (with --storage sqlite)")]
    sqlite_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageKind {
    Filesystem,
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Collect pricing observations for a date")]
    Collect {
        #[arg(long, help = "Date to collect (YYYY-MM-DD, default: today)")]
        date: Option<String>,
        #[arg(long, help = "Use fixture data instead of the live aggregator")]
        fixtures: bool,
        #[arg(long, help = "Collect from all sources with drift detection")]
        multi: bool,
        #[arg(long, default_value_t = stci_core::DEFAULT_DRIFT_THRESHOLD,
              help = "Maximum allowed price difference before a drift warning")]
        drift_threshold: f64,
        #[arg(long, help = "Do not fall back to fixtures on primary failure")]
        no_fallback: bool,
        #[arg(long, help = "Run every step but write nothing")]
        dry_run: bool,
    },
    #[command(about = "Compute the day's indices from stored observations")]
    Index {
        #[arg(long, help = "Date to index (YYYY-MM-DD, default: today)")]
        date: Option<String>,
        #[arg(long, help = "Methodology document (default: <data-dir>/fixtures/methodology.json)")]
        methodology: Option<PathBuf>,
        #[arg(long, help = "Run every step but write nothing")]
        dry_run: bool,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Show the most recently computed index")]
    Latest {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

/// Resolve the storage backend once at startup; everything downstream gets
/// the constructed instance injected.
fn storage_config(cli: &Cli, data_dir: &std::path::Path) -> stci_core::StorageConfig {
    match cli.storage {
        StorageKind::Filesystem => stci_core::StorageConfig::Filesystem {
            base_dir: data_dir.to_path_buf(),
        },
        StorageKind::Sqlite => stci_core::StorageConfig::Sqlite {
            db_path: cli
                .sqlite_path
                .clone()
                .unwrap_or_else(|| data_dir.join("stci.sqlite")),
        },
    }
}

fn default_data_dir() -> PathBuf {
    let local = PathBuf::from("data");
    if local.exists() {
        return local;
    }
    dirs::data_dir()
        .map(|d| d.join("stci"))
        .unwrap_or(local)
}

fn parse_date(date: Option<&str>) -> Result<chrono::NaiveDate> {
    match date {
        Some(s) => Ok(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let storage = storage_config(&cli, &data_dir).build()?;

    match &cli.command {
        Commands::Collect {
            date,
            fixtures,
            multi,
            drift_threshold,
            no_fallback,
            dry_run,
        } => {
            let date = parse_date(date.as_deref())?;
            commands::collect(
                storage.as_ref(),
                &data_dir,
                commands::CollectOptions {
                    date,
                    fixtures: *fixtures,
                    multi: *multi,
                    drift_threshold: *drift_threshold,
                    no_fallback: *no_fallback,
                    dry_run: *dry_run,
                },
            )
            .await
        }
        Commands::Index {
            date,
            methodology,
            dry_run,
            json,
        } => {
            let date = parse_date(date.as_deref())?;
            let methodology_path = methodology
                .clone()
                .unwrap_or_else(|| data_dir.join("fixtures/methodology.json"));
            commands::index(storage.as_ref(), &methodology_path, date, *dry_run, *json)
        }
        Commands::Latest { json } => commands::latest(storage.as_ref(), *json),
    }
}
