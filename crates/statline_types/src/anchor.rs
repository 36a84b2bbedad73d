//! Provenance anchors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum snippet length stored per anchor, in characters. Bounds storage;
/// longer snippets are truncated on construction and again by the assembler.
pub const MAX_SNIPPET_CHARS: usize = 800;

/// Modality the anchor was read from. Only text today; future loaders may
/// anchor into raster regions of scanned pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSource {
    Text,
}

impl AnchorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Provenance evidence: the page region and surrounding text a figure was
/// read from. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub source_type: AnchorSource,
    /// 1-based page number.
    pub page: u32,
    /// Region coordinates (x0, y0, x1, y1) in loader-defined units.
    pub bbox: [f64; 4],
    pub snippet: String,
}

impl Anchor {
    /// Build a text anchor, truncating the snippet to [`MAX_SNIPPET_CHARS`].
    pub fn text(page: u32, bbox: [f64; 4], snippet: impl Into<String>) -> Self {
        Self {
            source_type: AnchorSource::Text,
            page,
            bbox,
            snippet: truncate_snippet(snippet.into(), MAX_SNIPPET_CHARS),
        }
    }
}

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_snippet(mut s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            s.truncate(byte_idx);
            s
        }
        None => s,
    }
}

/// Position of an anchor within one extraction result's anchor batch.
///
/// Lines reference anchors purely by position; the assembler checks every
/// index against the batch length before writing anything, so a mismatched
/// engine can never produce a dangling link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorIndex(pub usize);

impl AnchorIndex {
    pub fn get(&self) -> usize {
        self.0
    }

    /// Validate this index against a batch of `len` anchors.
    pub fn checked(&self, len: usize) -> Result<usize, AnchorIndexError> {
        if self.0 < len {
            Ok(self.0)
        } else {
            Err(AnchorIndexError {
                index: self.0,
                len,
            })
        }
    }
}

impl From<usize> for AnchorIndex {
    fn from(idx: usize) -> Self {
        Self(idx)
    }
}

/// An anchor index pointing outside its batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("anchor index {index} out of range for batch of {len}")]
pub struct AnchorIndexError {
    pub index: usize,
    pub len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncated_on_char_boundary() {
        let long: String = "é".repeat(MAX_SNIPPET_CHARS + 10);
        let anchor = Anchor::text(1, [0.0; 4], long);
        assert_eq!(anchor.snippet.chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn short_snippet_kept_verbatim() {
        let anchor = Anchor::text(3, [1.0, 2.0, 3.0, 4.0], "Total assets 12 345");
        assert_eq!(anchor.snippet, "Total assets 12 345");
        assert_eq!(anchor.page, 3);
    }

    #[test]
    fn index_validation() {
        assert_eq!(AnchorIndex(1).checked(2), Ok(1));
        assert!(AnchorIndex(2).checked(2).is_err());
        assert!(AnchorIndex(0).checked(0).is_err());
    }
}
