//! relicd: the relic proxy daemon.
//!
//! # Usage
//!
//! ```text
//! relicd run --data-dir /var/lib/relic
//! relicd reconcile --data-dir /var/lib/relic
//! ```
//!
//! The data directory holds `config.toml` and `database-credentials.json`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relicd::{FatalError, bootstrap, reconcile_once};

#[derive(Parser)]
#[command(name = "relicd", about = "Relic proxy daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the proxy services and run until Ctrl-C.
    Run {
        /// Directory holding config.toml and database-credentials.json.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
    /// Clean up orphaned game servers once and exit.
    Reconcile {
        /// Directory holding config.toml and database-credentials.json.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Run { data_dir } => run(&data_dir).await,
        Command::Reconcile { data_dir } => reconcile(&data_dir).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relicd=debug,relic_reconcile=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(data_dir: &Path) -> anyhow::Result<()> {
    info!(dir = ?data_dir, "relic proxy starting");

    let services = bootstrap(data_dir).await.map_err(fatal)?;
    info!(
        cleaned = services.startup_report().total(),
        "startup reconciliation complete"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    services.shutdown().await;
    Ok(())
}

async fn reconcile(data_dir: &Path) -> anyhow::Result<()> {
    let report = reconcile_once(data_dir).await.map_err(fatal)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn fatal(err: FatalError) -> anyhow::Error {
    error!(error = %err, "fatal error, shutting down proxy");
    err.into()
}
