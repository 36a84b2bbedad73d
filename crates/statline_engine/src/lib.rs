//! Extraction engines for Statline.
//!
//! An engine is a pure function of a [`Document`]: given the same blocks it
//! must produce the same [`ExtractionResult`], so re-runs are diagnosable.
//! Returning zero lines is a valid outcome (no recognizable caption), not a
//! failure; engine errors are reserved for genuine faults.
//!
//! The bundled [`CaptionEngine`] is deliberately simple and swappable. New
//! layouts get new engine implementations; the leasing and assembly
//! contracts never change.

mod caption;
mod document;
mod pdf;

pub use caption::CaptionEngine;
pub use document::{Document, TextBlock};
pub use pdf::load_document;

use statline_types::ExtractionResult;
use thiserror::Error;

/// Engine or document-loading fault. Low-confidence results are not errors;
/// they surface through line statuses instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The PDF text layer could not be read.
    #[error("PDF text layer error: {0}")]
    TextLayer(String),

    /// The engine itself faulted.
    #[error("Extraction fault: {0}")]
    Fault(String),
}

/// The extraction capability.
pub trait ExtractionEngine: Send + Sync {
    fn extract(&self, doc: &Document) -> Result<ExtractionResult, EngineError>;

    /// Extract straight from raw document bytes. The default loads the PDF
    /// text layer; engines for other modalities (or test doubles) override
    /// this.
    fn extract_bytes(&self, bytes: &[u8]) -> Result<ExtractionResult, EngineError> {
        let doc = load_document(bytes)?;
        self.extract(&doc)
    }
}
