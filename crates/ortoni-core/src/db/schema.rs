//! SQLite schema for the run history file
//!
//! The two tables and two indexes are read by external tooling, so their
//! names and columns never change. The schema version lives in
//! `PRAGMA user_version` rather than a metadata table.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS test_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_date TEXT
);

CREATE TABLE IF NOT EXISTS test_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER,
    test_id TEXT,
    status TEXT,
    duration INTEGER,
    error_message TEXT,
    FOREIGN KEY (run_id) REFERENCES test_runs (id)
);
CREATE INDEX IF NOT EXISTS idx_test_id ON test_results(test_id);
CREATE INDEX IF NOT EXISTS idx_run_id ON test_results(run_id);
"#;

pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |r| r.get(0))
}

/// Create tables and indexes if missing.
///
/// Files written by older reporters have the tables but no version (and a
/// TEXT duration column); they are adopted in place since every read casts
/// `duration`.
pub fn create_schema(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;

    match current {
        v if v == CURRENT_SCHEMA_VERSION => {}
        v if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                found = v,
                supported = CURRENT_SCHEMA_VERSION,
                "History database was written by a newer version; reading it as-is"
            );
        }
        v => {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
            if v > 0 {
                tracing::info!(
                    "History schema updated from version {} to {}",
                    v,
                    CURRENT_SCHEMA_VERSION
                );
            }
        }
    }

    Ok(())
}
