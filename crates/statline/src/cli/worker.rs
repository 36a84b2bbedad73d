//! Worker command - run an extraction worker against the backlog.

use anyhow::Result;
use clap::Args;
use statline_db::StatlineDb;
use statline_engine::CaptionEngine;
use statline_fetch::HttpStore;
use statline_worker::{Worker, WorkerConfig, DEFAULT_POLL_INTERVAL};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Object storage endpoint
    #[arg(long, env = "STATLINE_STORAGE_ENDPOINT")]
    pub storage_endpoint: String,

    /// Object storage bucket holding the filings
    #[arg(long, env = "STATLINE_STORAGE_BUCKET", default_value = "filings")]
    pub storage_bucket: String,

    /// Service key for object storage auth
    #[arg(long, env = "STATLINE_SERVICE_KEY", hide_env_values = true)]
    pub service_key: String,

    /// Seconds to sleep between polls of an empty backlog
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval: u64,

    /// Exit once the backlog is empty instead of polling
    #[arg(long)]
    pub exit_when_idle: bool,
}

pub async fn run(db_path: &Path, args: WorkerArgs) -> Result<()> {
    let db = StatlineDb::open(db_path).await?;

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

    info!(db = %db_path.display(), "Starting worker");

    let (worker, shutdown_tx) = Worker::new(db, store, engine, config);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    worker.run().await
}
