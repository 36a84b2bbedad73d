//! Engine output contract.

use crate::{Anchor, StatementLine};
use serde::{Deserialize, Serialize};

/// What an extraction engine hands to the assembler: a batch of anchors and
/// the lines referencing them by position.
///
/// Engines must be deterministic (same document bytes, same result) so that
/// re-runs are diagnosable. Zero lines is a valid result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub lines: Vec<StatementLine>,
    pub anchors: Vec<Anchor>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.anchors.is_empty()
    }
}
