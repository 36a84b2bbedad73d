//! Domain types for Statline.
//!
//! These types are the single source of truth for the backlog, the two
//! statement containers, extracted lines and their provenance anchors. All
//! crates (db, engine, worker, CLI) use these types rather than redefining
//! their own.

mod anchor;
mod extraction;
mod job;
mod statement;

pub use anchor::{
    truncate_snippet, Anchor, AnchorIndex, AnchorIndexError, AnchorSource, MAX_SNIPPET_CHARS,
};
pub use extraction::ExtractionResult;
pub use job::{Job, JobStatus};
pub use statement::{
    LineSide, LineStatus, Period, Statement, StatementKind, StatementLine, DEFAULT_CURRENCY,
    DEFAULT_LANGUAGE,
};

use serde::{Deserialize, Serialize};

/// The logical document being analyzed. Created by upstream intake; this
/// subsystem only ever references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filing {
    pub id: i64,
    /// Display name, if intake recorded one.
    pub name: Option<String>,
}
