//! Regex caption-matching engine.
//!
//! Walks the document's blocks for known statement captions (in English,
//! French and German), anchors on the first matching block, and reads the
//! last numeric token on that page as the figure. Intentionally low-stakes:
//! layout-specific engines can replace this one without touching the
//! leasing or assembly contracts.

use crate::{Document, EngineError, ExtractionEngine, TextBlock};
use regex::Regex;
use statline_types::{
    Anchor, AnchorIndex, ExtractionResult, LineSide, StatementKind, StatementLine,
};
use tracing::debug;

/// Anchor snippets keep this much of the matched block.
const ANCHOR_SNIPPET_CHARS: usize = 200;

struct CaptionRule {
    /// Alternative caption spellings, first match wins.
    patterns: Vec<Regex>,
    /// Canonical caption recorded on the emitted line.
    caption: &'static str,
    kind: StatementKind,
    side: LineSide,
}

/// The default caption table: balance-sheet totals in en/fr/de filings.
pub struct CaptionEngine {
    rules: Vec<CaptionRule>,
    number: Regex,
}

impl CaptionEngine {
    pub fn new() -> Self {
        let rule = |patterns: &[&str], caption: &'static str, kind, side| CaptionRule {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("static caption pattern"))
                .collect(),
            caption,
            kind,
            side,
        };

        Self {
            rules: vec![
                rule(
                    &[r"Total\s+assets", r"Total\s+du\s+bilan", r"Summe\s+der\s+Aktiva"],
                    "Total Assets",
                    StatementKind::BalanceSheet,
                    LineSide::Assets,
                ),
                rule(
                    &[
                        r"Total\s+equity\s+and\s+liabilities",
                        r"Total\s+des\s+capitaux\s+propres.*passif",
                        r"Summe\s+des\s+Eigenkapitals.*Passiva",
                    ],
                    "Total Equity and Liabilities",
                    StatementKind::BalanceSheet,
                    LineSide::Liabilities,
                ),
            ],
            number: Regex::new(r"-?\d[\d\s\u{00a0}.,]{2,}").expect("static number pattern"),
        }
    }

    fn find_first<'a>(&self, doc: &'a Document, rule: &CaptionRule) -> Option<&'a TextBlock> {
        doc.blocks()
            .iter()
            .find(|block| rule.patterns.iter().any(|p| p.is_match(&block.text)))
    }

    /// Last numeric token on the page, parsed with European separators:
    /// spaces and dots are thousands grouping, comma is the decimal point.
    fn last_number_on_page(&self, doc: &Document, page: u32) -> Option<f64> {
        let text = doc.page_text(page);
        let raw = self.number.find_iter(&text).last()?.as_str();
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        normalized.trim_end_matches('.').parse::<f64>().ok()
    }
}

impl Default for CaptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionEngine for CaptionEngine {
    fn extract(&self, doc: &Document) -> Result<ExtractionResult, EngineError> {
        let mut result = ExtractionResult::default();

        for rule in &self.rules {
            let Some(block) = self.find_first(doc, rule) else {
                continue;
            };

            let value = self.last_number_on_page(doc, block.page);
            debug!(caption = rule.caption, page = block.page, ?value, "Caption matched");

            let anchor_idx = AnchorIndex(result.anchors.len());
            result.anchors.push(Anchor::text(
                block.page,
                block.bbox,
                statline_types::truncate_snippet(block.text.clone(), ANCHOR_SNIPPET_CHARS),
            ));

            let mut line = StatementLine::new(rule.kind, rule.caption);
            line.side = Some(rule.side);
            line.value = value;
            line.anchors = vec![anchor_idx];
            result.lines.push(line);
        }

        Ok(result)
    }
}
