//! Run-level and per-project statistics
//!
//! Everything here is recomputed from a result snapshot; nothing is stored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{TestResult, TestStatus};
use crate::store::ProjectSet;
use crate::time::ms_to_time;

/// Summary statistics of one run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Distinct tests that ended flaky
    pub flaky: usize,
    /// Retry attempts recorded
    pub retried: usize,
    /// Size of the counted (non-skipped, non-retry) set
    pub total: usize,
    /// Percentage with two decimals, `"0.00"` when nothing was counted
    pub success_rate: String,
    pub total_duration_ms: u64,
    /// `HH:MM:SS`
    pub total_duration: String,
}

impl RunSummary {
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.total_duration_ms = duration_ms;
        self.total_duration = ms_to_time(duration_ms);
        self
    }

    pub fn success_rate_value(&self) -> f64 {
        self.success_rate.parse().unwrap_or(0.0)
    }
}

/// Per-project row for the comparison table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_name: String,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub retried: usize,
    pub flaky: usize,
    pub total: usize,
}

/// Compute run statistics.
///
/// `filtered` is the counted view of `all` (skipped and retry attempts removed).
/// Passed, skipped, flaky and retried are taken from `all`; failed and the
/// success-rate denominator come from `filtered`.
pub fn summarize(all: &[TestResult], filtered: &[&TestResult]) -> RunSummary {
    let passed = count(all.iter(), |r| r.status == TestStatus::Passed);
    let flaky = distinct_flaky(all.iter());
    let failed = count(filtered.iter().copied(), |r| r.status.is_failure());
    let skipped = count(all.iter(), |r| r.status == TestStatus::Skipped);
    let retried = count(all.iter(), TestResult::is_retry);

    RunSummary {
        passed,
        failed,
        skipped,
        flaky,
        retried,
        total: filtered.len(),
        success_rate: success_rate(passed + flaky, filtered.len()),
        total_duration_ms: 0,
        total_duration: ms_to_time(0),
    }
}

/// `successes / considered * 100` with two decimals, clamped to `[0, 100]`.
/// An empty denominator yields `"0.00"`.
pub fn success_rate(successes: usize, considered: usize) -> String {
    if considered == 0 {
        return "0.00".to_string();
    }
    let rate = (successes as f64 / considered as f64 * 100.0).min(100.0);
    format!("{:.2}", rate)
}

/// One row per project in `projects`, in set order
pub fn project_stats(
    all: &[TestResult],
    filtered: &[&TestResult],
    projects: &ProjectSet,
) -> Vec<ProjectStats> {
    projects
        .names()
        .iter()
        .map(|project| {
            let in_project = |r: &TestResult| &r.project_name == project;
            let counted: Vec<&TestResult> =
                filtered.iter().copied().filter(|r| in_project(r)).collect();
            let everything = all.iter().filter(|r| in_project(r));

            ProjectStats {
                project_name: project.clone(),
                passed: count(counted.iter().copied(), |r| r.status == TestStatus::Passed),
                failed: count(counted.iter().copied(), |r| r.status.is_failure()),
                skipped: count(everything.clone(), |r| r.status == TestStatus::Skipped),
                retried: count(everything.clone(), TestResult::is_retry),
                flaky: distinct_flaky(everything),
                total: counted.len(),
            }
        })
        .collect()
}

/// Suite and test tags across all results, first-seen order
pub fn all_tags(all: &[TestResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for record in all {
        for tag in record.suite_tags.iter().chain(record.test_tags.iter()) {
            if seen.insert(tag.as_str()) {
                tags.push(tag.clone());
            }
        }
    }
    tags
}

fn count<'a, I, P>(records: I, predicate: P) -> usize
where
    I: Iterator<Item = &'a TestResult>,
    P: Fn(&TestResult) -> bool,
{
    records.filter(|r| predicate(r)).count()
}

/// Every attempt of a flaky test carries the flaky status, so count tests
/// rather than records
fn distinct_flaky<'a, I>(records: I) -> usize
where
    I: Iterator<Item = &'a TestResult>,
{
    records
        .filter(|r| r.status == TestStatus::Flaky)
        .map(|r| r.test_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{record, retry};
    use crate::store::ResultStore;

    fn five_test_run() -> ResultStore {
        let mut store = ResultStore::new();
        store.append(record("a.spec.ts", "chromium", "one", TestStatus::Passed));
        store.append(record("a.spec.ts", "chromium", "two", TestStatus::Passed));
        store.append(record("b.spec.ts", "chromium", "three", TestStatus::Passed));
        store.append(record("b.spec.ts", "chromium", "four", TestStatus::Failed));
        store.append(record("c.spec.ts", "chromium", "five", TestStatus::Flaky));
        store.append(retry(record("c.spec.ts", "chromium", "five", TestStatus::Flaky), 1));
        store
    }

    #[test]
    fn test_five_test_scenario() {
        let store = five_test_run();
        let filtered = store.counted();
        assert_eq!(filtered.len(), 5);

        let summary = summarize(store.all(), &filtered);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.flaky, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.retried, 1);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.success_rate, "80.00");
    }

    #[test]
    fn test_empty_filtered_set_rate_is_zero() {
        let mut store = ResultStore::new();
        store.append(record("a.spec.ts", "p", "skipped", TestStatus::Skipped));
        let summary = summarize(store.all(), &store.counted());
        assert_eq!(summary.success_rate, "0.00");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.success_rate_value(), 0.0);

        let empty = summarize(&[], &[]);
        assert_eq!(empty.success_rate, "0.00");
    }

    #[test]
    fn test_rate_bounds() {
        assert_eq!(success_rate(0, 3), "0.00");
        assert_eq!(success_rate(2, 3), "66.67");
        assert_eq!(success_rate(5, 3), "100.00");
    }

    #[test]
    fn test_counts_never_exceed_raw_attempts() {
        let store = five_test_run();
        let summary = summarize(store.all(), &store.counted());
        assert!(summary.passed + summary.failed + summary.skipped + summary.flaky <= store.len());
        let rate = summary.success_rate_value();
        assert!((0.0..=100.0).contains(&rate));
    }

    #[test]
    fn test_timed_out_counts_as_failed() {
        let mut store = ResultStore::new();
        store.append(record("a.spec.ts", "p", "slow", TestStatus::TimedOut));
        store.append(record("a.spec.ts", "p", "ok", TestStatus::Passed));
        let summary = summarize(store.all(), &store.counted());
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate, "50.00");
    }

    #[test]
    fn test_with_duration() {
        let summary = summarize(&[], &[]).with_duration(61_000);
        assert_eq!(summary.total_duration_ms, 61_000);
        assert_eq!(summary.total_duration, "00:01:01");
    }

    #[test]
    fn test_project_breakdown() {
        let mut store = ResultStore::new();
        store.append(record("a.spec.ts", "chromium", "one", TestStatus::Passed));
        store.append(record("a.spec.ts", "firefox", "one", TestStatus::Failed));
        store.append(retry(record("a.spec.ts", "firefox", "one", TestStatus::Failed), 1));
        store.append(record("a.spec.ts", "firefox", "two", TestStatus::Skipped));
        let projects: ProjectSet = ["chromium", "firefox"].into_iter().collect();

        let rows = project_stats(store.all(), &store.counted(), &projects);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].project_name, "chromium");
        assert_eq!(rows[0].passed, 1);
        assert_eq!(rows[0].total, 1);
        assert_eq!(rows[1].failed, 1);
        assert_eq!(rows[1].retried, 1);
        assert_eq!(rows[1].skipped, 1);
        assert_eq!(rows[1].total, 1);
    }

    #[test]
    fn test_all_tags_first_seen_order() {
        let mut first = record("a.spec.ts", "p", "one", TestStatus::Passed);
        first.suite_tags = vec!["@auth".to_string()];
        first.test_tags = vec!["@smoke".to_string()];
        let mut second = record("a.spec.ts", "p", "two", TestStatus::Passed);
        second.test_tags = vec!["@smoke".to_string(), "@slow".to_string()];

        assert_eq!(all_tags(&[first, second]), vec!["@auth", "@smoke", "@slow"]);
    }
}
