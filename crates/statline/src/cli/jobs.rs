//! Jobs command - backlog statistics and recent jobs.

use anyhow::Result;
use clap::Args;
use statline_db::StatlineDb;
use std::path::Path;

#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Number of recent jobs to list
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Emit machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(db_path: &Path, args: JobsArgs) -> Result<()> {
    let db = StatlineDb::open_existing(db_path).await?;

    let stats = db.queue_stats().await?;
    let jobs = db.list_recent_jobs(args.limit).await?;

    if args.json {
        let out = serde_json::json!({
            "stats": stats,
            "jobs": jobs,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Backlog: {} total / {} queued / {} processing / {} succeeded / {} failed",
        stats.total, stats.queued, stats.processing, stats.succeeded, stats.failed
    );
    println!();
    println!("{:>6}  {:>8}  {:<12}  {:<40}  ERROR", "ID", "FILING", "STATUS", "STORAGE PATH");
    for job in jobs {
        println!(
            "{:>6}  {:>8}  {:<12}  {:<40}  {}",
            job.id,
            job.filing_id,
            job.status.as_str(),
            job.storage_path,
            job.error.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
