//! Unified database layer for Statline.
//!
//! This crate is the single source of truth for all database operations:
//! the job backlog (leasing protocol), statement assembly and the anchor
//! store all live here. Other crates never touch raw sqlx.
//!
//! # Usage
//!
//! ```rust,ignore
//! use statline_db::{StatlineDb, Result};
//!
//! let db = StatlineDb::open("~/.statline/statline.sqlite3").await?;
//!
//! // Backlog
//! let job = db.lease_next().await?;
//!
//! // Assembly
//! db.ensure_statements(filing_id).await?;
//! db.persist_extraction(filing_id, &result).await?;
//! ```

mod assembler;
mod error;
mod queue;
mod schema;

pub use assembler::{AnchorRow, LineRow};
pub use error::{DbError, Result};
pub use queue::QueueStats;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Handle to the Statline database.
///
/// Cloning is cheap; all clones share one connection pool. The backlog table
/// is the only coordination point between worker processes, so any number of
/// handles (in any number of processes) may operate on the same file.
#[derive(Clone)]
pub struct StatlineDb {
    pool: SqlitePool,
}

impl StatlineDb {
    /// Open or create a database at the given path, creating all tables.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(db)
    }

    /// Open an existing database (fails if not present).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Underlying pool, for callers with queries this crate does not cover.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Register a filing (intake helper for the CLI and tests; production
    /// filings normally pre-exist, created by upstream intake).
    pub async fn create_filing(&self, name: Option<&str>) -> Result<i64> {
        let result = sqlx::query("INSERT INTO filing (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::StatlineDb;
    use tempfile::TempDir;

    /// A database on a temp file. The TempDir must outlive the handle.
    pub async fn open_temp_db() -> (TempDir, StatlineDb) {
        let tmp = TempDir::new().unwrap();
        let db = StatlineDb::open(tmp.path().join("statline.sqlite3"))
            .await
            .unwrap();
        (tmp, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.db");

        let db = StatlineDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        db.close().await;
    }

    #[tokio::test]
    async fn open_existing_fails_if_not_exists() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nonexistent.db");

        let result = StatlineDb::open_existing(&db_path).await;
        assert!(result.is_err());
    }
}
