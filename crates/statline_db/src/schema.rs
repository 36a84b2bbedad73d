//! Database schema creation for all Statline tables.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::StatlineDb;
use tracing::info;

impl StatlineDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // WAL for concurrent worker processes on one backlog file
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&self.pool)
            .await?;

        self.create_filing_tables().await?;
        self.create_backlog_tables().await?;

        info!("Database schema verified");
        Ok(())
    }

    /// Filing, statement, line, anchor and link tables.
    async fn create_filing_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS filing (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS statement (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filing_id INTEGER NOT NULL REFERENCES filing(id),
                type TEXT NOT NULL,
                language TEXT NOT NULL,
                currency TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(filing_id, type)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS statement_line (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                statement_id INTEGER NOT NULL REFERENCES statement(id),
                ref_code TEXT,
                caption TEXT NOT NULL,
                side TEXT,
                period INTEGER NOT NULL DEFAULT 0,
                value REAL,
                unit TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'extracted',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS anchor (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filing_id INTEGER NOT NULL REFERENCES filing(id),
                source_type TEXT NOT NULL DEFAULT 'text',
                page INTEGER NOT NULL,
                bbox TEXT NOT NULL,
                snippet TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // Many-to-many provenance links. datum_table discriminates future
        // datum kinds; only 'statement_line' is written today.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS datum_anchor (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datum_table TEXT NOT NULL,
                datum_id INTEGER NOT NULL,
                anchor_id INTEGER NOT NULL REFERENCES anchor(id)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_statement_filing ON statement(filing_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_line_statement ON statement_line(statement_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_anchor_filing ON anchor(filing_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_datum_anchor_datum ON datum_anchor(datum_table, datum_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Job backlog table.
    async fn create_backlog_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS job (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                storage_path TEXT NOT NULL,
                filing_id INTEGER NOT NULL REFERENCES filing(id),
                ruleset_id TEXT,
                status TEXT NOT NULL DEFAULT 'queued',
                error TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_status ON job(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_created ON job(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
