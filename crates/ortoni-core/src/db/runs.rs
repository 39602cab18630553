use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::{OrtoniError, Result};
use crate::map_db_err;
use crate::model::TestResult;
use crate::time::format_run_date;

impl super::HistoryDatabase {
    /// Record a new run dated now; returns its id
    pub fn save_run(&self) -> Result<i64> {
        self.save_run_at(Utc::now())
    }

    pub fn save_run_at(&self, run_date: DateTime<Utc>) -> Result<i64> {
        insert_run(&self.conn, run_date)
    }

    /// Persist every result of a run in one transaction
    pub fn save_results(&self, run_id: i64, results: &[TestResult]) -> Result<usize> {
        self.save_results_with(run_id, results, |_, _| Ok(()))
    }

    /// Like [`save_results`](Self::save_results), calling `before_row` ahead of
    /// each insert. An error from the hook or from any insert rolls the whole
    /// batch back.
    pub fn save_results_with<F>(
        &self,
        run_id: i64,
        results: &[TestResult],
        before_row: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, &TestResult) -> Result<()>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| OrtoniError::transaction("start", e))?;

        insert_results(&tx, run_id, results, before_row)?;

        tx.commit()
            .map_err(|e| OrtoniError::transaction("commit", e))?;

        tracing::debug!(run_id, rows = results.len(), "Saved run results");
        Ok(results.len())
    }

    /// Record a run dated now together with its results.
    ///
    /// The run row and every result row commit together; on any failure
    /// neither is kept.
    pub fn record_run(&self, results: &[TestResult]) -> Result<i64> {
        self.record_run_with(Utc::now(), results, |_, _| Ok(()))
    }

    pub fn record_run_with<F>(
        &self,
        run_date: DateTime<Utc>,
        results: &[TestResult],
        before_row: F,
    ) -> Result<i64>
    where
        F: FnMut(usize, &TestResult) -> Result<()>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| OrtoniError::transaction("start", e))?;

        let run_id = insert_run(&tx, run_date)?;
        insert_results(&tx, run_id, results, before_row)?;

        tx.commit()
            .map_err(|e| OrtoniError::transaction("commit", e))?;

        tracing::debug!(run_id, rows = results.len(), "Recorded run with results");
        Ok(run_id)
    }
}

fn insert_run(conn: &Connection, run_date: DateTime<Utc>) -> Result<i64> {
    conn.execute(
        "INSERT INTO test_runs (run_date) VALUES (?1)",
        params![format_run_date(run_date)],
    )
    .map_err(|e| map_db_err!("insert run", e))?;

    Ok(conn.last_insert_rowid())
}

fn insert_results<F>(
    conn: &Connection,
    run_id: i64,
    results: &[TestResult],
    mut before_row: F,
) -> Result<()>
where
    F: FnMut(usize, &TestResult) -> Result<()>,
{
    let mut stmt = conn
        .prepare(
            "INSERT INTO test_results (run_id, test_id, status, duration, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| map_db_err!("prepare result insert", e))?;

    for (row, result) in results.iter().enumerate() {
        before_row(row, result)?;
        stmt.execute(params![
            run_id,
            result.test_id,
            result.status.as_str(),
            result.duration as i64,
            result.error_message(),
        ])
        .map_err(|e| map_db_err!(&format!("insert result {}", result.test_id), e))?;
    }
    Ok(())
}
