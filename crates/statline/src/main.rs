//! Statline unified launcher.
//!
//! Subcommands:
//! - `worker`  run an extraction worker against the backlog
//! - `enqueue` add a filing-extraction job to the backlog
//! - `jobs`    show backlog statistics and recent jobs
//! - `reclaim` re-queue jobs stuck in `processing` (crashed workers)

use anyhow::Result;
use clap::{Parser, Subcommand};
use statline_logging::{init_logging, statline_home, LogConfig};
use std::path::PathBuf;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "statline", about = "Provenance-anchored statement extraction")]
struct Cli {
    /// Backlog database path (defaults to ~/.statline/statline.sqlite3)
    #[arg(long, global = true, env = "STATLINE_DB")]
    db: Option<PathBuf>,

    /// Verbose console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an extraction worker
    Worker(cli::worker::WorkerArgs),
    /// Add a job to the backlog
    Enqueue(cli::enqueue::EnqueueArgs),
    /// Show backlog statistics and recent jobs
    Jobs(cli::jobs::JobsArgs),
    /// Re-queue jobs stuck in processing longer than a threshold
    Reclaim(cli::reclaim::ReclaimArgs),
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db
        .clone()
        .unwrap_or_else(|| statline_home().join("statline.sqlite3"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    init_logging(LogConfig {
        app_name: "statline",
        verbose: args.verbose,
    })?;

    let db = db_path(&args);
    match args.command {
        Commands::Worker(cmd) => cli::worker::run(&db, cmd).await,
        Commands::Enqueue(cmd) => cli::enqueue::run(&db, cmd).await,
        Commands::Jobs(cmd) => cli::jobs::run(&db, cmd).await,
        Commands::Reclaim(cmd) => cli::reclaim::run(&db, cmd).await,
    }
}
