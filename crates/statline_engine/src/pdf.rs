//! PDF text-layer loading.
//!
//! Reduces a PDF's text layer to [`Document`] blocks: one block per
//! blank-line-separated paragraph. The text layer carries no glyph
//! geometry, so block bboxes are line extents within the page
//! (x = 0, y = first/last line index); a layout-aware loader can supply
//! real page coordinates without changing the engine contract.

use crate::{Document, EngineError, TextBlock};
use tracing::debug;

/// Load a document from raw PDF bytes.
pub fn load_document(bytes: &[u8]) -> Result<Document, EngineError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| EngineError::TextLayer(e.to_string()))?;

    let mut blocks = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        let page_no = (page_idx + 1) as u32;
        blocks.extend(split_blocks(page_no, page));
    }

    debug!(pages = pages.len(), blocks = blocks.len(), "Loaded PDF text layer");
    Ok(Document::new(blocks))
}

/// Split one page's text into paragraph blocks with line-extent bboxes.
fn split_blocks(page: u32, text: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_line = 0usize;

    let mut flush = |lines: &mut Vec<&str>, start: usize, end: usize| {
        if lines.is_empty() {
            return;
        }
        blocks.push(TextBlock {
            page,
            bbox: [0.0, start as f64, 0.0, end as f64],
            text: lines.join("\n"),
        });
        lines.clear();
    };

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            flush(&mut current, start_line, line_no.saturating_sub(1));
        } else {
            if current.is_empty() {
                start_line = line_no;
            }
            current.push(line);
        }
    }
    let total = text.lines().count();
    flush(&mut current, start_line, total.saturating_sub(1));

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paragraphs_into_blocks() {
        let blocks = split_blocks(2, "Balance sheet\nas of 31 Dec\n\nTotal assets\n12 345\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Balance sheet\nas of 31 Dec");
        assert_eq!(blocks[1].text, "Total assets\n12 345");
        assert_eq!(blocks[1].page, 2);
        assert_eq!(blocks[1].bbox, [0.0, 3.0, 0.0, 4.0]);
    }

    #[test]
    fn blank_page_yields_no_blocks() {
        assert!(split_blocks(1, "\n  \n").is_empty());
        assert!(split_blocks(1, "").is_empty());
    }
}
