//! Read-side history queries: per-test history, trends, flaky and slow tests

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::aggregate::success_rate;
use crate::error::Result;
use crate::map_db_err;
use crate::time::format_local;

/// Status values counted as a pass or a failure in history statistics.
/// A flaky row is both: it failed at least once and finally passed.
const PASS_STATUSES: &str = "('passed', 'flaky')";
const FAIL_STATUSES: &str = "('failed', 'timedOut', 'flaky')";

/// One past outcome of a single test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: String,
    pub duration: u64,
    pub error_message: String,
    /// Local, human-readable run date
    pub run_date: String,
}

/// Pass/fail counts and average duration of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub run_date: String,
    pub passed: u64,
    pub failed: u64,
    pub avg_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlakyTest {
    pub test_id: String,
    pub passes: u64,
    pub failures: u64,
    pub total_runs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowTest {
    pub test_id: String,
    pub avg_duration: u64,
    pub runs: u64,
}

/// Totals over the whole history file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total_runs: u64,
    pub total_tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub avg_duration: u64,
    pub pass_rate: String,
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

impl super::HistoryDatabase {
    /// Most recent outcomes of `test_id`, newest first
    pub fn get_history(&self, test_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tr.status, CAST(tr.duration AS INTEGER), tr.error_message, trun.run_date
                 FROM test_results tr
                 JOIN test_runs trun ON tr.run_id = trun.id
                 WHERE tr.test_id = ?1
                 ORDER BY trun.run_date DESC, trun.id DESC
                 LIMIT ?2",
            )
            .map_err(|e| map_db_err!("prepare history query", e))?;

        let rows = stmt
            .query_map(params![test_id, limit as i64], |row| {
                let run_date: String = row.get::<_, Option<String>>(3)?.unwrap_or_default();
                Ok(HistoryEntry {
                    status: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    duration: non_negative(row.get::<_, Option<i64>>(1)?.unwrap_or(0)),
                    error_message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    run_date: format_local(&run_date),
                })
            })
            .map_err(|e| map_db_err!("query history", e))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Pass/fail counts and average duration per run date, most recent first.
    ///
    /// Every run carries its own millisecond timestamp, so each run date is
    /// one bucket. Rows are grouped by run id so two runs stamped in the same
    /// millisecond still report separately.
    pub fn get_trends(&self, limit: usize) -> Result<Vec<TrendPoint>> {
        let sql = format!(
            "SELECT trun.run_date,
                    SUM(CASE WHEN tr.status IN {pass} THEN 1 ELSE 0 END),
                    SUM(CASE WHEN tr.status IN ('failed', 'timedOut') THEN 1 ELSE 0 END),
                    CAST(ROUND(AVG(CAST(tr.duration AS REAL))) AS INTEGER)
             FROM test_runs trun
             JOIN test_results tr ON tr.run_id = trun.id
             GROUP BY trun.id
             ORDER BY trun.run_date DESC, trun.id DESC
             LIMIT ?1",
            pass = PASS_STATUSES
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| map_db_err!("prepare trends query", e))?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(TrendPoint {
                    run_date: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    passed: non_negative(row.get(1)?),
                    failed: non_negative(row.get(2)?),
                    avg_duration: non_negative(row.get::<_, Option<i64>>(3)?.unwrap_or(0)),
                })
            })
            .map_err(|e| map_db_err!("query trends", e))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Tests that have both passed and failed, most failures first
    pub fn get_flaky_tests(&self, limit: usize) -> Result<Vec<FlakyTest>> {
        let sql = format!(
            "SELECT test_id,
                    SUM(CASE WHEN status IN {pass} THEN 1 ELSE 0 END) AS passes,
                    SUM(CASE WHEN status IN {fail} THEN 1 ELSE 0 END) AS failures,
                    COUNT(*)
             FROM test_results
             GROUP BY test_id
             HAVING passes > 0 AND failures > 0
             ORDER BY failures DESC, test_id ASC
             LIMIT ?1",
            pass = PASS_STATUSES,
            fail = FAIL_STATUSES
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| map_db_err!("prepare flaky tests query", e))?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(FlakyTest {
                    test_id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    passes: non_negative(row.get(1)?),
                    failures: non_negative(row.get(2)?),
                    total_runs: non_negative(row.get(3)?),
                })
            })
            .map_err(|e| map_db_err!("query flaky tests", e))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Tests by average duration, slowest first
    pub fn get_slow_tests(&self, limit: usize) -> Result<Vec<SlowTest>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT test_id,
                        AVG(CAST(duration AS REAL)) AS avg_duration,
                        COUNT(*)
                 FROM test_results
                 GROUP BY test_id
                 ORDER BY avg_duration DESC, test_id ASC
                 LIMIT ?1",
            )
            .map_err(|e| map_db_err!("prepare slow tests query", e))?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                let avg: Option<f64> = row.get(1)?;
                Ok(SlowTest {
                    test_id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    avg_duration: avg.unwrap_or(0.0).round().max(0.0) as u64,
                    runs: non_negative(row.get(2)?),
                })
            })
            .map_err(|e| map_db_err!("query slow tests", e))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_summary_data(&self) -> Result<HistorySummary> {
        let sql = format!(
            "SELECT (SELECT COUNT(*) FROM test_runs),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN status IN {pass} THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('failed', 'timedOut') THEN 1 ELSE 0 END), 0),
                    COALESCE(AVG(CAST(duration AS REAL)), 0.0)
             FROM test_results",
            pass = PASS_STATUSES
        );

        let (runs, tests, passed, failed, avg): (i64, i64, i64, i64, f64) = self
            .conn
            .query_row(&sql, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .map_err(|e| map_db_err!("query history summary", e))?;

        let (passed, failed) = (non_negative(passed), non_negative(failed));
        Ok(HistorySummary {
            total_runs: non_negative(runs),
            total_tests: non_negative(tests),
            passed,
            failed,
            avg_duration: avg.round().max(0.0) as u64,
            pass_rate: success_rate(passed as usize, (passed + failed) as usize),
        })
    }
}
