//! Located text blocks, the engine's view of a document.

/// One block of text with its page and region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// 1-based page number.
    pub page: u32,
    /// Region coordinates (x0, y0, x1, y1) in loader-defined units.
    pub bbox: [f64; 4],
    pub text: String,
}

/// A document reduced to located text blocks.
///
/// Loaders build this; engines only read it. Blocks are ordered as the
/// loader emitted them (page order, then reading order within a page).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<TextBlock>,
}

impl Document {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Full text of one page, blocks joined by blank lines.
    pub fn page_text(&self, page: u32) -> String {
        let mut parts = Vec::new();
        for block in &self.blocks {
            if block.page == page {
                parts.push(block.text.as_str());
            }
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_joins_blocks_of_one_page() {
        let doc = Document::new(vec![
            TextBlock {
                page: 1,
                bbox: [0.0; 4],
                text: "Header".into(),
            },
            TextBlock {
                page: 2,
                bbox: [0.0; 4],
                text: "Total assets".into(),
            },
            TextBlock {
                page: 2,
                bbox: [0.0; 4],
                text: "12 345".into(),
            },
        ]);

        assert_eq!(doc.page_text(2), "Total assets\n\n12 345");
        assert_eq!(doc.page_text(3), "");
    }
}
