//! Enqueue command - add a filing-extraction job to the backlog.

use anyhow::Result;
use clap::Args;
use statline_db::StatlineDb;
use std::path::Path;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Object storage path of the source document
    pub storage_path: String,

    /// Target filing id; omit to register a new filing
    #[arg(long)]
    pub filing: Option<i64>,

    /// Display name when registering a new filing
    #[arg(long)]
    pub filing_name: Option<String>,

    /// Ruleset identity for layout-specific heuristics
    #[arg(long)]
    pub ruleset: Option<String>,
}

pub async fn run(db_path: &Path, args: EnqueueArgs) -> Result<()> {
    let db = StatlineDb::open(db_path).await?;

    let filing_id = match args.filing {
        Some(id) => id,
        None => {
            let id = db.create_filing(args.filing_name.as_deref()).await?;
            println!("Registered filing {id}");
            id
        }
    };

    let job_id = db
        .enqueue_job(&args.storage_path, filing_id, args.ruleset.as_deref())
        .await?;
    println!("Enqueued job {job_id} for filing {filing_id} ({})", args.storage_path);

    Ok(())
}
