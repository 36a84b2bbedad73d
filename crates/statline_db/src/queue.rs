//! Job backlog and leasing protocol.
//!
//! Any number of worker processes share one backlog. Leasing takes an
//! exclusive claim on one row inside a single transaction; a claim another
//! leaser won first is skipped, not waited on, so concurrent leasers each
//! find the next unclaimed candidate. Two callers can never receive the
//! same job.
//!
//! There is deliberately no lease expiry: a worker that crashes after
//! leasing leaves its job in `processing` until an operator invokes
//! [`StatlineDb::reclaim_stale`]. See DESIGN.md.

use crate::error::{DbError, Result};
use crate::StatlineDb;
use sqlx::Row;
use statline_types::{Job, JobStatus};
use std::time::Duration;
use tracing::{debug, info};

/// Candidates fetched per scan. A deep backlog is walked in batches rather
/// than loaded wholesale; a fully contended batch triggers a re-scan.
const LEASE_SCAN_BATCH: i64 = 16;

impl StatlineDb {
    /// Add a job to the backlog in `queued` state (upstream intake).
    pub async fn enqueue_job(
        &self,
        storage_path: &str,
        filing_id: i64,
        ruleset_id: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO job (storage_path, filing_id, ruleset_id, status)
            VALUES (?, ?, ?, 'queued')
            "#,
        )
        .bind(storage_path)
        .bind(filing_id)
        .bind(ruleset_id)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Lease the oldest queued job, atomically moving it to `processing`.
    ///
    /// Candidates are ordered by creation time, ties broken by id. Each
    /// claim is one conditional UPDATE issued as its own atomic statement;
    /// that statement is the sole linearization point, so a concurrent
    /// leaser winning the row shows up as zero affected rows (lease
    /// contention, an expected outcome, not a lock error) and the scan moves
    /// on to the next candidate. Wrapping the scan in one deferred
    /// transaction would not work here: the opening SELECT takes a read
    /// snapshot, and once another leaser commits, the snapshot cannot be
    /// upgraded to a write lock. Returns None without side effects when no
    /// claimable job exists.
    pub async fn lease_next(&self) -> Result<Option<Job>> {
        loop {
            let candidates: Vec<i64> = sqlx::query_scalar(
                r#"
                SELECT id FROM job
                WHERE status = 'queued'
                ORDER BY created_at ASC, id ASC
                LIMIT ?
                "#,
            )
            .bind(LEASE_SCAN_BATCH)
            .fetch_all(self.pool())
            .await?;

            if candidates.is_empty() {
                return Ok(None);
            }
            // A short batch means the scan saw the whole remaining queue.
            let saw_whole_queue = (candidates.len() as i64) < LEASE_SCAN_BATCH;

            for job_id in candidates {
                let claimed = sqlx::query(
                    r#"
                    UPDATE job
                    SET status = 'processing', updated_at = CURRENT_TIMESTAMP
                    WHERE id = ? AND status = 'queued'
                    "#,
                )
                .bind(job_id)
                .execute(self.pool())
                .await?
                .rows_affected();

                if claimed == 0 {
                    debug!(job_id, "Lease contention, skipping to next candidate");
                    continue;
                }

                let row = sqlx::query("SELECT * FROM job WHERE id = ?")
                    .bind(job_id)
                    .fetch_one(self.pool())
                    .await?;
                let job = row_to_job(&row)?;

                info!(job_id, filing_id = job.filing_id, "Leased job");
                return Ok(Some(job));
            }

            if saw_whole_queue {
                return Ok(None);
            }
            // Every candidate in a full batch was claimed elsewhere; later
            // queued rows may still be free, so scan again.
        }
    }

    /// Record a terminal outcome for a job.
    ///
    /// Idempotent, last write wins: repeated calls (or calls for an unknown
    /// id) succeed without effect beyond the final UPDATE. Callers treat
    /// this as a best-effort sink, so it never invents new failure modes of
    /// its own beyond a genuine database error. A job that is still
    /// `queued` is left untouched: only leasing moves a job out of the
    /// queue, so an outcome for a never-leased job has nothing to report
    /// against.
    pub async fn report(
        &self,
        job_id: i64,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(DbError::invalid_state(format!(
                "report accepts terminal statuses only, got '{}'",
                status
            )));
        }

        sqlx::query(
            r#"
            UPDATE job
            SET status = ?, error = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status != 'queued'
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(job_id)
        .execute(self.pool())
        .await?;

        info!(job_id, %status, "Job reported");
        Ok(())
    }

    /// Get a job by id.
    pub async fn get_job(&self, id: i64) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM job WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    /// Most recently created jobs, newest first.
    pub async fn list_recent_jobs(&self, limit: u32) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM job ORDER BY created_at DESC, id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(row_to_job).collect()
    }

    /// Re-queue jobs stuck in `processing` longer than `older_than`.
    ///
    /// The leasing protocol itself never expires a lease; this is the
    /// operator-invoked policy escape hatch for crashed workers. Returns the
    /// number of jobs re-queued.
    pub async fn reclaim_stale(&self, older_than: Duration) -> Result<u64> {
        let cutoff = format!("-{} seconds", older_than.as_secs());

        let result = sqlx::query(
            r#"
            UPDATE job
            SET status = 'queued', error = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE status = 'processing'
              AND updated_at <= datetime('now', ?)
            "#,
        )
        .bind(&cutoff)
        .execute(self.pool())
        .await?;

        let reclaimed = result.rows_affected();
        if reclaimed > 0 {
            info!(reclaimed, "Reclaimed stale processing jobs");
        }
        Ok(reclaimed)
    }

    /// Backlog statistics per status.
    pub async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                SUM(CASE WHEN status = 'queued' THEN 1 ELSE 0 END) as queued,
                SUM(CASE WHEN status = 'processing' THEN 1 ELSE 0 END) as processing,
                SUM(CASE WHEN status = 'succeeded' THEN 1 ELSE 0 END) as succeeded,
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) as failed
            FROM job
            "#,
        )
        .fetch_one(self.pool())
        .await?;

        Ok(QueueStats {
            total: row.get::<i64, _>("total") as u64,
            queued: row.get::<Option<i64>, _>("queued").unwrap_or(0) as u64,
            processing: row.get::<Option<i64>, _>("processing").unwrap_or(0) as u64,
            succeeded: row.get::<Option<i64>, _>("succeeded").unwrap_or(0) as u64,
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0) as u64,
        })
    }
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job> {
    let status_str: String = row.get("status");
    let status = JobStatus::parse(&status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown job status: {}", status_str)))?;

    Ok(Job {
        id: row.get("id"),
        storage_path: row.get("storage_path"),
        filing_id: row.get("filing_id"),
        ruleset_id: row.get("ruleset_id"),
        status,
        error: row.get("error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Backlog statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub total: u64,
    pub queued: u64,
    pub processing: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_temp_db;
    use std::collections::HashSet;

    async fn seed_filing(db: &StatlineDb) -> i64 {
        db.create_filing(Some("ACME Corp FY2025")).await.unwrap()
    }

    #[tokio::test]
    async fn lease_on_empty_backlog_returns_none() {
        let (_tmp, db) = open_temp_db().await;

        let job = db.lease_next().await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn lease_claims_oldest_first() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;

        let first = db
            .enqueue_job("filings/a.pdf", filing_id, None)
            .await
            .unwrap();
        let _second = db
            .enqueue_job("filings/b.pdf", filing_id, None)
            .await
            .unwrap();

        let job = db.lease_next().await.unwrap().unwrap();
        assert_eq!(job.id, first);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.storage_path, "filings/a.pdf");
    }

    #[tokio::test]
    async fn leased_job_is_not_leased_twice() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.enqueue_job("filings/a.pdf", filing_id, None)
            .await
            .unwrap();

        let first = db.lease_next().await.unwrap();
        let second = db.lease_next().await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn concurrent_leasers_never_share_a_job() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;

        const JOBS: usize = 8;
        const LEASERS: usize = 4;

        for i in 0..JOBS {
            db.enqueue_job(&format!("filings/{i}.pdf"), filing_id, None)
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..LEASERS {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut leased = Vec::new();
                while let Some(job) = db.lease_next().await.unwrap() {
                    leased.push(job.id);
                }
                leased
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let distinct: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), JOBS, "every job leased exactly once");
        assert_eq!(distinct.len(), JOBS, "no job leased by two callers");
    }

    #[tokio::test]
    async fn concurrent_leasers_drain_a_backlog_deeper_than_one_scan_batch() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;

        let jobs = (LEASE_SCAN_BATCH as usize) * 2 + 3;
        for i in 0..jobs {
            db.enqueue_job(&format!("filings/{i}.pdf"), filing_id, None)
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut leased = Vec::new();
                while let Some(job) = db.lease_next().await.unwrap() {
                    leased.push(job.id);
                }
                leased
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let distinct: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), jobs, "every job leased exactly once");
        assert_eq!(distinct.len(), jobs, "no job leased by two callers");
    }

    #[tokio::test]
    async fn report_on_a_queued_job_is_a_no_op() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        let job_id = db
            .enqueue_job("filings/a.pdf", filing_id, None)
            .await
            .unwrap();

        // Never leased: a terminal report must not skip the processing
        // state.
        db.report(job_id, JobStatus::Succeeded, None).await.unwrap();

        let job = db.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.error, None);
    }

    #[tokio::test]
    async fn report_is_idempotent_last_write_wins() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        let job_id = db
            .enqueue_job("filings/a.pdf", filing_id, None)
            .await
            .unwrap();
        db.lease_next().await.unwrap().unwrap();

        db.report(job_id, JobStatus::Failed, Some("fetch timed out"))
            .await
            .unwrap();
        db.report(job_id, JobStatus::Succeeded, None).await.unwrap();

        let job = db.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.error, None);

        // Unknown ids are a no-op, not an error.
        db.report(9999, JobStatus::Failed, Some("who?")).await.unwrap();
    }

    #[tokio::test]
    async fn report_rejects_non_terminal_status() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        let job_id = db
            .enqueue_job("filings/a.pdf", filing_id, None)
            .await
            .unwrap();

        let result = db.report(job_id, JobStatus::Processing, None).await;
        assert!(result.is_err());

        // The queued job is untouched; it still has to be leased first.
        let job = db.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn reclaim_stale_requeues_only_old_processing_jobs() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        let stuck = db
            .enqueue_job("filings/stuck.pdf", filing_id, None)
            .await
            .unwrap();
        let fresh = db
            .enqueue_job("filings/fresh.pdf", filing_id, None)
            .await
            .unwrap();

        db.lease_next().await.unwrap().unwrap();
        db.lease_next().await.unwrap().unwrap();

        // Age the first lease past the cutoff.
        sqlx::query("UPDATE job SET updated_at = datetime('now', '-1 hour') WHERE id = ?")
            .bind(stuck)
            .execute(db.pool())
            .await
            .unwrap();

        let reclaimed = db.reclaim_stale(Duration::from_secs(600)).await.unwrap();
        assert_eq!(reclaimed, 1);

        let stuck_job = db.get_job(stuck).await.unwrap().unwrap();
        let fresh_job = db.get_job(fresh).await.unwrap().unwrap();
        assert_eq!(stuck_job.status, JobStatus::Queued);
        assert_eq!(fresh_job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn queue_stats_counts_by_status() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;

        for i in 0..3 {
            db.enqueue_job(&format!("filings/{i}.pdf"), filing_id, None)
                .await
                .unwrap();
        }
        let leased = db.lease_next().await.unwrap().unwrap();
        db.report(leased.id, JobStatus::Succeeded, None)
            .await
            .unwrap();
        let leased = db.lease_next().await.unwrap().unwrap();
        db.report(leased.id, JobStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let stats = db.queue_stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.processing, 0);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
    }
}
