//! History access that never fails the report
//!
//! [`HistoryStore`] wraps an optional [`HistoryDatabase`]. When the database
//! could not be opened, or a query fails, callers get empty data and the
//! store keeps a note explaining why, which the report shows in place of the
//! missing sections.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::RunSummary;
use crate::db::{FlakyTest, HistoryDatabase, HistoryEntry, HistorySummary, SlowTest, TrendPoint};
use crate::error::{OrtoniError, Result};
use crate::model::TestResult;
use crate::time::format_local;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_TREND_LIMIT: usize = 30;
pub const DEFAULT_FLAKY_LIMIT: usize = 10;
pub const DEFAULT_SLOW_LIMIT: usize = 10;

/// Analytics panel data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalytics {
    pub summary: HistorySummary,
    pub trends: Vec<TrendPoint>,
    pub flaky_tests: Vec<FlakyTest>,
    pub slow_tests: Vec<SlowTest>,
}

/// Trend series laid out for a line chart, oldest run first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartTrendData {
    pub labels: Vec<String>,
    pub passed: Vec<u64>,
    pub failed: Vec<u64>,
    pub avg_duration: Vec<u64>,
}

impl ChartTrendData {
    /// `trends` is most recent first
    pub fn from_trends(trends: &[TrendPoint]) -> Self {
        let mut chart = ChartTrendData::default();
        for point in trends.iter().rev() {
            chart.labels.push(format_local(&point.run_date));
            chart.passed.push(point.passed);
            chart.failed.push(point.failed);
            chart.avg_duration.push(point.avg_duration);
        }
        chart
    }
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    db: Option<HistoryDatabase>,
    note: Option<String>,
}

impl HistoryStore {
    /// Open the history file; on failure the store is empty and carries a note
    pub fn initialize(path: &Path) -> Self {
        match HistoryDatabase::open(path) {
            Ok(db) => {
                tracing::debug!(path = %path.display(), "Opened history database");
                HistoryStore {
                    db: Some(db),
                    note: None,
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "History database unavailable");
                HistoryStore {
                    db: None,
                    note: Some(OrtoniError::HistoryUnavailable(e.to_string()).to_string()),
                }
            }
        }
    }

    /// A store that was intentionally not opened
    pub fn disabled(reason: &str) -> Self {
        HistoryStore {
            db: None,
            note: Some(reason.to_string()),
        }
    }

    pub fn from_database(db: HistoryDatabase) -> Self {
        HistoryStore {
            db: Some(db),
            note: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Record the run; `None` when history is unavailable
    pub fn save_run(&mut self, summary: &RunSummary) -> Option<i64> {
        let db = self.db.as_ref()?;
        let result = db.save_run();
        let run_id = self.recover("save run", result)?;
        tracing::debug!(
            run_id,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "Recorded run"
        );
        Some(run_id)
    }

    /// Persist a run's results; returns whether they were stored
    pub fn save_results(&mut self, run_id: i64, results: &[TestResult]) -> bool {
        let Some(db) = self.db.as_ref() else {
            return false;
        };
        let result = db.save_results(run_id, results);
        self.recover("save results", result).is_some()
    }

    /// Record the run and its results atomically; `None` when history is
    /// unavailable or the write was rolled back
    pub fn record_run(&mut self, summary: &RunSummary, results: &[TestResult]) -> Option<i64> {
        let db = self.db.as_ref()?;
        let result = db.record_run(results);
        let run_id = self.recover("record run", result)?;
        tracing::info!(
            run_id,
            total = summary.total,
            results = results.len(),
            "Saved results to history"
        );
        Some(run_id)
    }

    pub fn get_history(&mut self, test_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.query("read test history", |db| db.get_history(test_id, limit))
    }

    pub fn get_trends(&mut self, limit: usize) -> Vec<TrendPoint> {
        self.query("read trends", |db| db.get_trends(limit))
    }

    pub fn get_flaky_tests(&mut self, limit: usize) -> Vec<FlakyTest> {
        self.query("read flaky tests", |db| db.get_flaky_tests(limit))
    }

    pub fn get_slow_tests(&mut self, limit: usize) -> Vec<SlowTest> {
        self.query("read slow tests", |db| db.get_slow_tests(limit))
    }

    pub fn get_summary_data(&mut self) -> HistorySummary {
        self.query("read history summary", HistoryDatabase::get_summary_data)
    }

    pub fn analytics(&mut self) -> HistoryAnalytics {
        HistoryAnalytics {
            summary: self.get_summary_data(),
            trends: self.get_trends(DEFAULT_TREND_LIMIT),
            flaky_tests: self.get_flaky_tests(DEFAULT_FLAKY_LIMIT),
            slow_tests: self.get_slow_tests(DEFAULT_SLOW_LIMIT),
        }
    }

    pub fn chart_trend_data(&mut self, limit: usize) -> ChartTrendData {
        ChartTrendData::from_trends(&self.get_trends(limit))
    }

    /// Release the database. Safe to call repeatedly or on a store that never opened.
    pub fn close(&mut self) {
        if self.db.take().is_some() {
            tracing::debug!("Closed history database");
        }
    }

    fn query<T, F>(&mut self, operation: &str, run: F) -> T
    where
        T: Default,
        F: FnOnce(&HistoryDatabase) -> Result<T>,
    {
        let Some(db) = self.db.as_ref() else {
            return T::default();
        };
        let result = run(db);
        self.recover(operation, result).unwrap_or_default()
    }

    fn recover<T>(&mut self, operation: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(operation, error = %e, "History operation failed");
                if self.note.is_none() {
                    self.note = Some(OrtoniError::HistoryUnavailable(e.to_string()).to_string());
                }
                None
            }
        }
    }
}
