//! Statline extraction worker.
//!
//! One worker loop per process; any number of processes may run against the
//! same backlog with no coordination beyond the leasing protocol.

mod worker;

pub use worker::{Worker, WorkerConfig, WorkerError, DEFAULT_POLL_INTERVAL};
