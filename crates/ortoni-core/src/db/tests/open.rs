use crate::db::*;
use tempfile::tempdir;

#[test]
fn test_open_creates_two_tables_and_indexes() {
    let dir = tempdir().unwrap();
    let db = HistoryDatabase::open(&dir.path().join("ortoni-data-history.sqlite")).unwrap();

    let tables: Vec<String> = db
        .conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(tables, vec!["test_results", "test_runs"]);

    let indexes: Vec<String> = db
        .conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(indexes, vec!["idx_run_id", "idx_test_id"]);

    assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_open_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("history.sqlite");
    let _db = HistoryDatabase::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_reopen_keeps_runs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.sqlite");
    {
        let db = HistoryDatabase::open(&path).unwrap();
        db.save_run().unwrap();
    }
    let db = HistoryDatabase::open(&path).unwrap();
    assert_eq!(db.run_count().unwrap(), 1);
}

#[test]
fn test_adopts_unversioned_legacy_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.sqlite");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE test_runs (id INTEGER PRIMARY KEY AUTOINCREMENT, run_date TEXT);
             CREATE TABLE test_results (id INTEGER PRIMARY KEY AUTOINCREMENT, run_id INTEGER,
                 test_id TEXT, status TEXT, duration TEXT, error_message TEXT,
                 FOREIGN KEY (run_id) REFERENCES test_runs (id));
             INSERT INTO test_runs (run_date) VALUES ('2024-01-01T00:00:00.000Z');
             INSERT INTO test_results (run_id, test_id, status, duration, error_message)
                 VALUES (1, 'a.spec.ts:p:t', 'passed', '250', '');",
        )
        .unwrap();
    }

    let db = HistoryDatabase::open(&path).unwrap();
    assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    let history = db.get_history("a.spec.ts:p:t", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].duration, 250);
}

#[test]
fn test_open_fails_on_garbage_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.sqlite");
    std::fs::write(&path, vec![b'x'; 8192]).unwrap();
    assert!(HistoryDatabase::open(&path).is_err());
}
