//! Statement assembly: container creation and transactional persistence of
//! extraction results with their anchors.

use crate::error::{DbError, Result};
use crate::StatlineDb;
use sqlx::Row;
use statline_types::{
    truncate_snippet, Anchor, AnchorSource, ExtractionResult, LineStatus, Period, Statement,
    StatementKind, DEFAULT_CURRENCY, DEFAULT_LANGUAGE, MAX_SNIPPET_CHARS,
};
use tracing::{debug, info};

impl StatlineDb {
    /// Make sure both statement containers exist for a filing.
    ///
    /// Check-then-insert per kind, safe to call on every job run. The
    /// UNIQUE(filing_id, type) index backstops the narrow race if two
    /// processes ever assembled the same filing concurrently (the leasing
    /// protocol currently prevents that).
    pub async fn ensure_statements(&self, filing_id: i64) -> Result<()> {
        for kind in StatementKind::ALL {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM statement WHERE filing_id = ? AND type = ?")
                    .bind(filing_id)
                    .bind(kind.as_str())
                    .fetch_optional(self.pool())
                    .await?;

            if exists.is_none() {
                sqlx::query(
                    r#"
                    INSERT INTO statement (filing_id, type, language, currency)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(filing_id)
                .bind(kind.as_str())
                .bind(DEFAULT_LANGUAGE)
                .bind(DEFAULT_CURRENCY)
                .execute(self.pool())
                .await?;
                debug!(filing_id, kind = kind.as_str(), "Created statement container");
            }
        }
        Ok(())
    }

    /// Persist an extraction result as one transaction.
    ///
    /// Anchors are inserted first, in input order, and lines reference them
    /// by position in that input batch. Every anchor index is validated
    /// before the first row is written, and any failure rolls the whole
    /// batch back, so readers never observe anchors without their lines or
    /// links pointing at rows that do not exist.
    pub async fn persist_extraction(
        &self,
        filing_id: i64,
        result: &ExtractionResult,
    ) -> Result<()> {
        for line in &result.lines {
            for idx in &line.anchors {
                idx.checked(result.anchors.len())
                    .map_err(|e| DbError::assembly(e.to_string()))?;
            }
        }

        let mut tx = self.pool().begin().await?;

        let mut anchor_ids = Vec::with_capacity(result.anchors.len());
        for anchor in &result.anchors {
            let id = insert_anchor(&mut tx, filing_id, anchor).await?;
            anchor_ids.push(id);
        }

        for line in &result.lines {
            let statement_id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM statement WHERE filing_id = ? AND type = ?")
                    .bind(filing_id)
                    .bind(line.statement_kind.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            let statement_id = statement_id.ok_or_else(|| {
                DbError::assembly(format!(
                    "no {} statement for filing {} (ensure_statements not run?)",
                    line.statement_kind, filing_id
                ))
            })?;

            let line_id = sqlx::query(
                r#"
                INSERT INTO statement_line
                    (statement_id, ref_code, caption, side, period, value, unit, status)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(statement_id)
            .bind(&line.ref_code)
            .bind(&line.caption)
            .bind(line.side.map(|s| s.as_str()))
            .bind(line.period.ordinal())
            .bind(line.value)
            .bind(&line.unit)
            .bind(line.status.as_str())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for idx in &line.anchors {
                sqlx::query(
                    r#"
                    INSERT INTO datum_anchor (datum_table, datum_id, anchor_id)
                    VALUES ('statement_line', ?, ?)
                    "#,
                )
                .bind(line_id)
                .bind(anchor_ids[idx.get()])
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            filing_id,
            lines = result.lines.len(),
            anchors = result.anchors.len(),
            "Persisted extraction result"
        );
        Ok(())
    }

    /// Look up a filing's statement container of one kind.
    pub async fn get_statement(
        &self,
        filing_id: i64,
        kind: StatementKind,
    ) -> Result<Option<Statement>> {
        let row = sqlx::query("SELECT * FROM statement WHERE filing_id = ? AND type = ?")
            .bind(filing_id)
            .bind(kind.as_str())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(Statement {
                id: row.get("id"),
                filing_id: row.get("filing_id"),
                kind,
                language: row.get("language"),
                currency: row.get("currency"),
            })),
            None => Ok(None),
        }
    }

    /// All statements of a filing.
    pub async fn statements_for_filing(&self, filing_id: i64) -> Result<Vec<Statement>> {
        let rows = sqlx::query("SELECT * FROM statement WHERE filing_id = ? ORDER BY id")
            .bind(filing_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let kind_str: String = row.get("type");
                let kind = StatementKind::parse(&kind_str).ok_or_else(|| {
                    DbError::invalid_state(format!("Unknown statement kind: {}", kind_str))
                })?;
                Ok(Statement {
                    id: row.get("id"),
                    filing_id: row.get("filing_id"),
                    kind,
                    language: row.get("language"),
                    currency: row.get("currency"),
                })
            })
            .collect()
    }

    /// Persisted lines of one statement, oldest first.
    pub async fn lines_for_statement(&self, statement_id: i64) -> Result<Vec<LineRow>> {
        let rows = sqlx::query("SELECT * FROM statement_line WHERE statement_id = ? ORDER BY id")
            .bind(statement_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(row_to_line).collect()
    }

    /// Anchors supporting one line, via the datum link table.
    pub async fn anchors_for_line(&self, line_id: i64) -> Result<Vec<AnchorRow>> {
        let rows = sqlx::query(
            r#"
            SELECT a.* FROM anchor a
            JOIN datum_anchor da ON da.anchor_id = a.id
            WHERE da.datum_table = 'statement_line' AND da.datum_id = ?
            ORDER BY a.id
            "#,
        )
        .bind(line_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_anchor).collect()
    }

    /// Count all anchors recorded for a filing.
    pub async fn anchor_count_for_filing(&self, filing_id: i64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM anchor WHERE filing_id = ?")
            .bind(filing_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count as u64)
    }
}

async fn insert_anchor(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    filing_id: i64,
    anchor: &Anchor,
) -> Result<i64> {
    let bbox = serde_json::to_string(&anchor.bbox)?;
    let snippet = truncate_snippet(anchor.snippet.clone(), MAX_SNIPPET_CHARS);

    let id = sqlx::query(
        r#"
        INSERT INTO anchor (filing_id, source_type, page, bbox, snippet)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(filing_id)
    .bind(anchor.source_type.as_str())
    .bind(anchor.page as i64)
    .bind(bbox)
    .bind(snippet)
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    Ok(id)
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<LineRow> {
    let status_str: String = row.get("status");
    let status = LineStatus::parse(&status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown line status: {}", status_str)))?;
    let period_ord: i64 = row.get("period");
    let period = Period::from_ordinal(period_ord)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown period ordinal: {}", period_ord)))?;

    Ok(LineRow {
        id: row.get("id"),
        statement_id: row.get("statement_id"),
        ref_code: row.get("ref_code"),
        caption: row.get("caption"),
        side: row.get("side"),
        period,
        value: row.get("value"),
        unit: row.get("unit"),
        status,
    })
}

fn row_to_anchor(row: &sqlx::sqlite::SqliteRow) -> Result<AnchorRow> {
    let source_str: String = row.get("source_type");
    let source_type = AnchorSource::parse(&source_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown anchor source: {}", source_str)))?;
    let bbox_json: String = row.get("bbox");
    let bbox: [f64; 4] = serde_json::from_str(&bbox_json)?;

    Ok(AnchorRow {
        id: row.get("id"),
        filing_id: row.get("filing_id"),
        source_type,
        page: row.get::<i64, _>("page") as u32,
        bbox,
        snippet: row.get("snippet"),
    })
}

/// A persisted statement line.
#[derive(Debug, Clone)]
pub struct LineRow {
    pub id: i64,
    pub statement_id: i64,
    pub ref_code: Option<String>,
    pub caption: String,
    pub side: Option<String>,
    pub period: Period,
    pub value: Option<f64>,
    pub unit: String,
    pub status: LineStatus,
}

/// A persisted anchor.
#[derive(Debug, Clone)]
pub struct AnchorRow {
    pub id: i64,
    pub filing_id: i64,
    pub source_type: AnchorSource,
    pub page: u32,
    pub bbox: [f64; 4],
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_temp_db;
    use statline_types::{AnchorIndex, LineSide, StatementLine};

    async fn seed_filing(db: &StatlineDb) -> i64 {
        db.create_filing(Some("ACME Corp FY2025")).await.unwrap()
    }

    fn total_assets_line(anchors: Vec<AnchorIndex>) -> StatementLine {
        let mut line = StatementLine::new(StatementKind::BalanceSheet, "Total Assets");
        line.side = Some(LineSide::Assets);
        line.value = Some(12345.0);
        line.anchors = anchors;
        line
    }

    #[tokio::test]
    async fn ensure_statements_is_idempotent() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;

        db.ensure_statements(filing_id).await.unwrap();
        db.ensure_statements(filing_id).await.unwrap();

        let statements = db.statements_for_filing(filing_id).await.unwrap();
        assert_eq!(statements.len(), 2);

        let kinds: Vec<StatementKind> = statements.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&StatementKind::BalanceSheet));
        assert!(kinds.contains(&StatementKind::Pnl));

        let bs = db
            .get_statement(filing_id, StatementKind::BalanceSheet)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bs.language, "en");
        assert_eq!(bs.currency, "EUR");
    }

    #[tokio::test]
    async fn persist_links_lines_to_the_declared_anchor() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.ensure_statements(filing_id).await.unwrap();

        // Two anchors; the line declares index 1, so it must link to the
        // second one, not the first.
        let result = ExtractionResult {
            anchors: vec![
                Anchor::text(1, [0.0, 0.0, 100.0, 20.0], "Balance sheet heading"),
                Anchor::text(3, [10.0, 40.0, 200.0, 60.0], "Total assets 12 345"),
            ],
            lines: vec![total_assets_line(vec![AnchorIndex(1)])],
        };
        db.persist_extraction(filing_id, &result).await.unwrap();

        let statement = db
            .get_statement(filing_id, StatementKind::BalanceSheet)
            .await
            .unwrap()
            .unwrap();
        let lines = db.lines_for_statement(statement.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].value, Some(12345.0));

        let anchors = db.anchors_for_line(lines[0].id).await.unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].page, 3);
        assert_eq!(anchors[0].snippet, "Total assets 12 345");
    }

    #[tokio::test]
    async fn out_of_range_anchor_index_persists_nothing() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.ensure_statements(filing_id).await.unwrap();

        let result = ExtractionResult {
            anchors: vec![Anchor::text(1, [0.0; 4], "only anchor")],
            lines: vec![total_assets_line(vec![AnchorIndex(0), AnchorIndex(1)])],
        };

        let err = db.persist_extraction(filing_id, &result).await;
        assert!(matches!(err, Err(DbError::Assembly(_))));

        assert_eq!(db.anchor_count_for_filing(filing_id).await.unwrap(), 0);
        let statement = db
            .get_statement(filing_id, StatementKind::BalanceSheet)
            .await
            .unwrap()
            .unwrap();
        assert!(db.lines_for_statement(statement.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_container_rolls_back_inserted_anchors() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        // ensure_statements deliberately not called: line insertion fails
        // after the anchor was already written inside the transaction.

        let result = ExtractionResult {
            anchors: vec![Anchor::text(2, [0.0; 4], "orphan-to-be")],
            lines: vec![total_assets_line(vec![AnchorIndex(0)])],
        };

        let err = db.persist_extraction(filing_id, &result).await;
        assert!(err.is_err());
        assert_eq!(db.anchor_count_for_filing(filing_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_result_is_a_valid_persist() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.ensure_statements(filing_id).await.unwrap();

        db.persist_extraction(filing_id, &ExtractionResult::default())
            .await
            .unwrap();

        assert_eq!(db.anchor_count_for_filing(filing_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn line_with_no_anchors_is_legal() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.ensure_statements(filing_id).await.unwrap();

        let mut line = StatementLine::new(StatementKind::Pnl, "Net revenue");
        line.status = LineStatus::NotFound;
        line.value = None;
        let result = ExtractionResult {
            anchors: vec![],
            lines: vec![line],
        };
        db.persist_extraction(filing_id, &result).await.unwrap();

        let statement = db
            .get_statement(filing_id, StatementKind::Pnl)
            .await
            .unwrap()
            .unwrap();
        let lines = db.lines_for_statement(statement.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].status, LineStatus::NotFound);
        assert!(db.anchors_for_line(lines[0].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snippets_are_truncated_at_persist_time() {
        let (_tmp, db) = open_temp_db().await;
        let filing_id = seed_filing(&db).await;
        db.ensure_statements(filing_id).await.unwrap();

        let long = "x".repeat(MAX_SNIPPET_CHARS * 2);
        let mut anchor = Anchor::text(1, [0.0; 4], "");
        anchor.snippet = long; // bypass the constructor's truncation
        let result = ExtractionResult {
            anchors: vec![anchor],
            lines: vec![total_assets_line(vec![AnchorIndex(0)])],
        };
        db.persist_extraction(filing_id, &result).await.unwrap();

        let statement = db
            .get_statement(filing_id, StatementKind::BalanceSheet)
            .await
            .unwrap()
            .unwrap();
        let lines = db.lines_for_statement(statement.id).await.unwrap();
        let anchors = db.anchors_for_line(lines[0].id).await.unwrap();
        assert_eq!(anchors[0].snippet.chars().count(), MAX_SNIPPET_CHARS);
    }
}
