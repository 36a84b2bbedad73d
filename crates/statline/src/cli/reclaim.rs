//! Reclaim command - re-queue jobs stuck in `processing`.
//!
//! The leasing protocol has no automatic lease expiry; a worker crash
//! strands its job. This command is the operator-driven policy decision the
//! protocol deliberately leaves out.

use anyhow::Result;
use clap::Args;
use statline_db::StatlineDb;
use std::path::Path;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ReclaimArgs {
    /// Re-queue jobs processing for longer than this many seconds
    #[arg(long, default_value_t = 3600)]
    pub older_than: u64,
}

pub async fn run(db_path: &Path, args: ReclaimArgs) -> Result<()> {
    let db = StatlineDb::open_existing(db_path).await?;

    let reclaimed = db
        .reclaim_stale(Duration::from_secs(args.older_than))
        .await?;
    println!(
        "Re-queued {reclaimed} job(s) processing for more than {}s",
        args.older_than
    );

    Ok(())
}
