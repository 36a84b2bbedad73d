//! Statement containers and line items.

use crate::anchor::AnchorIndex;
use serde::{Deserialize, Serialize};

/// Default language recorded on newly created statements.
pub const DEFAULT_LANGUAGE: &str = "en";
/// Default reporting currency recorded on statements and lines.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// The two statement containers a filing carries, each at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    BalanceSheet,
    Pnl,
}

impl StatementKind {
    /// Both kinds, in the order the assembler creates them.
    pub const ALL: [StatementKind; 2] = [StatementKind::BalanceSheet, StatementKind::Pnl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheet",
            Self::Pnl => "pnl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "balance_sheet" => Some(Self::BalanceSheet),
            "pnl" => Some(Self::Pnl),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side/category of the statement a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSide {
    Assets,
    Liabilities,
    Equity,
    Revenue,
    Expense,
}

impl LineSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Liabilities => "liabilities",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assets" => Some(Self::Assets),
            "liabilities" => Some(Self::Liabilities),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// Reporting period of a figure, stored as an ordinal (current = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Current,
    Previous,
}

impl Period {
    pub fn ordinal(&self) -> i64 {
        match self {
            Self::Current => 0,
            Self::Previous => 1,
        }
    }

    pub fn from_ordinal(ord: i64) -> Option<Self> {
        match ord {
            0 => Some(Self::Current),
            1 => Some(Self::Previous),
            _ => None,
        }
    }
}

/// Extraction confidence recorded on every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// A caption matched and a value was read next to it.
    Extracted,
    /// No recognizable caption in the document.
    NotFound,
    /// Multiple conflicting candidates; needs human review.
    Ambiguous,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "extracted" => Some(Self::Extracted),
            "not_found" => Some(Self::NotFound),
            "ambiguous" => Some(Self::Ambiguous),
            _ => None,
        }
    }
}

/// A statement container row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub id: i64,
    pub filing_id: i64,
    pub kind: StatementKind,
    pub language: String,
    pub currency: String,
}

/// One reported figure, as emitted by an extraction engine.
///
/// `anchors` holds indices into the [`crate::ExtractionResult`] anchor batch
/// this line travels with; the assembler resolves them to row ids at persist
/// time. An empty list is legal (a claim with no located provenance), though
/// discouraged for `extracted` lines. Note the subsystem does not reject the
/// contradictory combination of `status = extracted` with no value; readers
/// flag that for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    pub statement_kind: StatementKind,
    /// Classification code from the active ruleset, if any.
    pub ref_code: Option<String>,
    pub caption: String,
    pub side: Option<LineSide>,
    pub period: Period,
    /// Absent means the value could not be determined.
    pub value: Option<f64>,
    pub unit: String,
    pub status: LineStatus,
    pub anchors: Vec<AnchorIndex>,
}

impl StatementLine {
    /// A line with the fixed defaults (current period, default currency,
    /// extracted status). Callers override fields as needed.
    pub fn new(kind: StatementKind, caption: impl Into<String>) -> Self {
        Self {
            statement_kind: kind,
            ref_code: None,
            caption: caption.into(),
            side: None,
            period: Period::Current,
            value: None,
            unit: DEFAULT_CURRENCY.to_string(),
            status: LineStatus::Extracted,
            anchors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips() {
        for kind in StatementKind::ALL {
            assert_eq!(StatementKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn period_ordinals_match_storage_encoding() {
        assert_eq!(Period::Current.ordinal(), 0);
        assert_eq!(Period::Previous.ordinal(), 1);
        assert_eq!(Period::from_ordinal(1), Some(Period::Previous));
        assert_eq!(Period::from_ordinal(2), None);
    }
}
