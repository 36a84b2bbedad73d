//! CLI commands for the Statline launcher.

pub mod enqueue;
pub mod jobs;
pub mod reclaim;
pub mod worker;
