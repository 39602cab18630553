//! SQLite-backed run history

mod queries;
mod runs;
mod schema;

use std::path::Path;

use rusqlite::Connection;

use crate::error::{OrtoniError, Result};
use crate::map_db_err;

pub use queries::{FlakyTest, HistoryEntry, HistorySummary, SlowTest, TrendPoint};
pub use schema::{create_schema, CURRENT_SCHEMA_VERSION};

/// Append-only log of runs and per-test outcomes
#[derive(Debug)]
pub struct HistoryDatabase {
    conn: Connection,
}

impl HistoryDatabase {
    /// Open or create the history file at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OrtoniError::io_operation("create directory", parent.display(), e))?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            OrtoniError::Database(format!(
                "failed to open database at {}: {}",
                db_path.display(),
                e
            ))
        })?;

        Self::from_connection(conn)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| map_db_err!("open database", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| map_db_err!("enable WAL mode", e))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| map_db_err!("enable foreign keys", e))?;

        create_schema(&conn).map_err(|e| map_db_err!("create history schema", e))?;

        Ok(HistoryDatabase { conn })
    }

    pub fn run_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM test_runs", [], |r| r.get(0))
            .map_err(|e| map_db_err!("count runs", e))
    }

    /// Number of result rows stored for one run
    pub fn result_count(&self, run_id: i64) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM test_results WHERE run_id = ?1",
                [run_id],
                |r| r.get(0),
            )
            .map_err(|e| map_db_err!("count results", e))
    }

    pub fn schema_version(&self) -> Result<i32> {
        schema::schema_version(&self.conn).map_err(|e| map_db_err!("read schema version", e))
    }
}

impl Drop for HistoryDatabase {
    fn drop(&mut self) {
        // Fold the WAL back so the history file can be copied or archived alone
        let _ = self.conn.pragma_update(None, "wal_checkpoint", "TRUNCATE");
    }
}

#[cfg(test)]
mod tests;
