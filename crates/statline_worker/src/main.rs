//! Statline worker binary.
//!
//! Usage:
//!     statline-worker --db ~/.statline/statline.sqlite3 \
//!         --storage-endpoint https://storage.example.com \
//!         --storage-bucket filings

use clap::Parser;
use statline_db::StatlineDb;
use statline_engine::CaptionEngine;
use statline_fetch::HttpStore;
use statline_logging::{init_logging, statline_home, LogConfig};
use statline_worker::{Worker, WorkerConfig, DEFAULT_POLL_INTERVAL};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "statline-worker", about = "Extraction worker for Statline")]
struct Args {
    /// Backlog database path (defaults to ~/.statline/statline.sqlite3)
    #[arg(long, env = "STATLINE_DB")]
    db: Option<PathBuf>,

    /// Object storage endpoint
    #[arg(long, env = "STATLINE_STORAGE_ENDPOINT")]
    storage_endpoint: String,

    /// Object storage bucket holding the filings
    #[arg(long, env = "STATLINE_STORAGE_BUCKET", default_value = "filings")]
    storage_bucket: String,

    /// Service key for object storage auth
    #[arg(long, env = "STATLINE_SERVICE_KEY", hide_env_values = true)]
    service_key: String,

    /// Seconds to sleep between polls of an empty backlog
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval: u64,

    /// Exit once the backlog is empty instead of polling
    #[arg(long)]
    exit_when_idle: bool,

    /// Verbose console logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(LogConfig {
        app_name: "statline-worker",
        verbose: args.verbose,
    })?;

    let db_path = args
        .db
        .unwrap_or_else(|| statline_home().join("statline.sqlite3"));
    let db = StatlineDb::open(&db_path).await?;

    let store = Arc::new(HttpStore::new(
        &args.storage_endpoint,
        &args.storage_bucket,
        &args.service_key,
    ));
    let engine = Arc::new(CaptionEngine::new());

    let config = WorkerConfig {
        poll_interval: Duration::from_secs(args.poll_interval),
        exit_when_idle: args.exit_when_idle,
    };

    info!(db = %db_path.display(), endpoint = %args.storage_endpoint, "Starting worker");

    let (worker, shutdown_tx) = Worker::new(db, store, engine, config);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    worker.run().await
}
