//! Worker loop.
//!
//! Per job: lease -> fetch -> extract -> assemble -> report. Any error in
//! the middle steps reports the job as failed with the error's text and the
//! loop moves on; a failed job stays failed (manual re-queueing is an
//! operator action). An empty backlog is polled on a fixed interval, no
//! backoff.

use statline_db::{DbError, StatlineDb};
use statline_engine::{EngineError, ExtractionEngine};
use statline_fetch::{DocumentStore, RetrievalError};
use statline_types::{Job, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Default sleep between polls of an empty backlog.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Job-fatal errors, by pipeline stage. The Display text becomes the job's
/// stored failure cause.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Extraction(#[from] EngineError),

    #[error(transparent)]
    Assembly(#[from] DbError),
}

/// Worker configuration (plain data).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when the backlog is empty.
    pub poll_interval: Duration,
    /// Stop instead of sleeping when the backlog is empty. Used by tests
    /// and one-shot drain runs.
    pub exit_when_idle: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            exit_when_idle: false,
        }
    }
}

/// The worker: drives the pipeline end to end, one job at a time.
pub struct Worker {
    db: StatlineDb,
    store: Arc<dyn DocumentStore>,
    engine: Arc<dyn ExtractionEngine>,
    config: WorkerConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Worker {
    /// Build a worker. Returns the worker and a shutdown sender; sending on
    /// it (or dropping all senders is not enough - send explicitly) makes
    /// the loop exit after the in-flight job completes.
    pub fn new(
        db: StatlineDb,
        store: Arc<dyn DocumentStore>,
        engine: Arc<dyn ExtractionEngine>,
        config: WorkerConfig,
    ) -> (Self, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            Self {
                db,
                store,
                engine,
                config,
                shutdown_rx,
            },
            shutdown_tx,
        )
    }

    /// Run the loop until shutdown (or until idle, when configured).
    /// Consumes self: a worker runs once.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Worker started"
        );

        loop {
            if self.shutdown_rx.try_recv().is_ok() {
                info!("Shutdown requested");
                break;
            }

            match self.db.lease_next().await {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    if self.config.exit_when_idle {
                        info!("Backlog empty, exiting");
                        break;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = self.shutdown_rx.recv() => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }
                Err(e) => {
                    // Backlog unreachable. Nothing was leased, so nothing
                    // is lost; wait and try again.
                    error!(error = %e, "Lease failed");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        Ok(())
    }

    /// Run one leased job to a terminal report.
    async fn process(&self, job: Job) {
        let job_id = job.id;
        let (status, job_error) = match self.run_job(&job).await {
            Ok(()) => {
                info!(job_id, filing_id = job.filing_id, "Job succeeded");
                (JobStatus::Succeeded, None)
            }
            Err(e) => {
                warn!(job_id, filing_id = job.filing_id, error = %e, "Job failed");
                (JobStatus::Failed, Some(e.to_string()))
            }
        };

        // Reporting is a best-effort sink; a failure here must not take the
        // loop down. The job stays `processing` until reclaimed.
        if let Err(e) = self.db.report(job_id, status, job_error.as_deref()).await {
            error!(job_id, error = %e, "Failed to report job outcome");
        }
    }

    async fn run_job(&self, job: &Job) -> Result<(), WorkerError> {
        debug!(job_id = job.id, path = %job.storage_path, "Fetching document");
        let bytes = self.store.fetch(&job.storage_path).await?;

        debug!(job_id = job.id, size = bytes.len(), "Extracting");
        let result = self.engine.extract_bytes(&bytes)?;

        debug!(
            job_id = job.id,
            lines = result.lines.len(),
            anchors = result.anchors.len(),
            "Assembling"
        );
        // Containers are ensured as part of assembly, so a failed fetch or
        // extract leaves no statement rows behind, while a document with no
        // recognizable captions still gets its two (empty) containers.
        self.db.ensure_statements(job.filing_id).await?;
        self.db.persist_extraction(job.filing_id, &result).await?;

        Ok(())
    }
}
