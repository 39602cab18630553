//! Run lifecycle: owns the results of one run between `begin` and `end`

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::{summarize, RunSummary};
use crate::config::{OpenMode, ReporterConfig};
use crate::error::Result;
use crate::model::{AttemptResult, HostEvent, RunStatus, TestCaseInfo, TestResult};
use crate::normalize::ResultNormalizer;
use crate::pipeline::{generate_report, open_history};
use crate::shard::ShardFile;
use crate::store::{is_counted, ProjectSet, ResultStore};

/// What the end of a run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "path")]
pub enum RunOutput {
    Report(PathBuf),
    Shard(PathBuf),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub output: RunOutput,
    pub status: RunStatus,
    pub summary: RunSummary,
    /// Whether the caller should open the report, per the `open` setting
    pub should_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_note: Option<String>,
}

/// Accumulates normalized results for one run
#[derive(Debug)]
pub struct Reporter {
    config: ReporterConfig,
    normalizer: ResultNormalizer,
    store: ResultStore,
    projects: ProjectSet,
}

impl Reporter {
    pub fn new(config: ReporterConfig) -> Self {
        let normalizer = ResultNormalizer::new(PathBuf::new(), &config);
        Reporter {
            config,
            normalizer,
            store: ResultStore::new(),
            projects: ProjectSet::default(),
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn results(&self) -> &[TestResult] {
        self.store.all()
    }

    pub fn projects(&self) -> &ProjectSet {
        &self.projects
    }

    /// Start a run: clears state left by any previous run
    pub fn on_begin(&mut self, root_dir: &Path) {
        self.store.clear();
        self.projects.clear();
        self.normalizer = ResultNormalizer::new(root_dir, &self.config);
        tracing::debug!(root = %root_dir.display(), "Run started");
    }

    pub fn on_test_begin(&mut self, test_id: &str) {
        tracing::trace!(test = %test_id, "Test started");
    }

    pub fn on_test_end(&mut self, test: &TestCaseInfo, result: &AttemptResult) {
        let record = self.normalizer.normalize(test, result, &mut self.projects);
        tracing::debug!(
            test = %record.test_id,
            status = %record.status,
            retry = record.retry_attempt_count,
            "Test finished"
        );
        self.store.append(record);
    }

    /// Finish the run: write a shard file when running as a shard, otherwise
    /// persist history and write the report
    pub fn on_end(&mut self, status: RunStatus, duration_ms: u64) -> Result<RunOutcome> {
        if let Some(shard) = self.config.shard {
            let file = ShardFile::new(
                self.store.all().to_vec(),
                self.projects.clone(),
                duration_ms,
                &self.config,
            )?;
            let path = file.write(&self.config.folder(), &shard)?;
            let filtered: Vec<&TestResult> = self.store.filter(is_counted);
            return Ok(RunOutcome {
                output: RunOutput::Shard(path),
                status,
                summary: summarize(self.store.all(), &filtered).with_duration(duration_ms),
                should_open: false,
                history_note: None,
            });
        }

        let history = open_history(&self.config, self.config.save_history_enabled());
        let generated = generate_report(
            &self.config,
            self.store.all(),
            &self.projects,
            duration_ms,
            history,
        )?;

        Ok(RunOutcome {
            output: RunOutput::Report(generated.report_path),
            status,
            summary: generated.summary,
            should_open: should_open(self.config.open, status),
            history_note: generated.history_note,
        })
    }

    /// Dispatch one host event; returns the outcome once the run ends
    pub fn handle(&mut self, event: HostEvent) -> Result<Option<RunOutcome>> {
        match event {
            HostEvent::Begin { root_dir } => self.on_begin(&root_dir),
            HostEvent::TestBegin { test_id } => self.on_test_begin(&test_id),
            HostEvent::TestEnd { test, result } => self.on_test_end(&test, &result),
            HostEvent::End { status, duration } => return self.on_end(status, duration).map(Some),
        }
        Ok(None)
    }
}

fn should_open(mode: OpenMode, status: RunStatus) -> bool {
    match mode {
        OpenMode::Always => true,
        OpenMode::Never => false,
        OpenMode::OnFailure => status != RunStatus::Passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardDescriptor;
    use crate::model::{SourceLocation, TestOutcome, TestStatus};
    use crate::report::read_payload;
    use tempfile::tempdir;

    fn case(project: &str, title: &str, outcome: TestOutcome) -> TestCaseInfo {
        TestCaseInfo {
            id: format!("{}-{}", project, title),
            title: title.to_string(),
            title_path: vec![
                String::new(),
                project.to_string(),
                "tests/cart.spec.ts".to_string(),
                "Cart".to_string(),
                title.to_string(),
            ],
            location: SourceLocation {
                file: PathBuf::from("/repo/tests/cart.spec.ts"),
                line: 3,
                column: 7,
            },
            outcome,
            ..Default::default()
        }
    }

    fn attempt(status: TestStatus, retry: u32) -> AttemptResult {
        AttemptResult {
            retry,
            duration: 100,
            ..AttemptResult::new(status)
        }
    }

    fn config_in(dir: &Path) -> ReporterConfig {
        ReporterConfig {
            folder_path: dir.to_string_lossy().into_owned(),
            ..ReporterConfig::default()
        }
    }

    fn run_five(reporter: &mut Reporter) {
        reporter.on_begin(Path::new("/repo"));
        for title in ["a", "b", "c"] {
            reporter.on_test_end(&case("chromium", title, TestOutcome::Expected), &attempt(TestStatus::Passed, 0));
        }
        reporter.on_test_end(&case("chromium", "d", TestOutcome::Unexpected), &attempt(TestStatus::Failed, 0));
        let flaky = case("chromium", "e", TestOutcome::Flaky);
        reporter.on_test_end(&flaky, &attempt(TestStatus::Failed, 0));
        reporter.on_test_end(&flaky, &attempt(TestStatus::Passed, 1));
    }

    #[test]
    fn test_full_run_writes_report() {
        let dir = tempdir().unwrap();
        let mut reporter = Reporter::new(config_in(dir.path()));
        run_five(&mut reporter);

        let outcome = reporter.on_end(RunStatus::Failed, 4_000).unwrap();
        assert_eq!(outcome.summary.total, 5);
        assert_eq!(outcome.summary.passed, 3);
        assert_eq!(outcome.summary.flaky, 1);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.success_rate, "80.00");
        assert!(!outcome.should_open);

        let RunOutput::Report(path) = &outcome.output else {
            panic!("expected a report, got {:?}", outcome.output);
        };
        let payload = read_payload(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(payload["summary"]["successRate"], "80.00");
        assert!(dir.path().join("ortoni-data-history.sqlite").exists());
    }

    #[test]
    fn test_begin_resets_previous_run() {
        let dir = tempdir().unwrap();
        let mut reporter = Reporter::new(config_in(dir.path()));
        run_five(&mut reporter);
        assert_eq!(reporter.results().len(), 6);

        reporter.on_begin(Path::new("/repo"));
        assert!(reporter.results().is_empty());
        assert!(reporter.projects().is_empty());
    }

    #[test]
    fn test_shard_run_writes_shard_file() {
        let dir = tempdir().unwrap();
        let config = ReporterConfig {
            shard: Some(ShardDescriptor { current: 2, total: 3 }),
            open: OpenMode::Always,
            ..config_in(dir.path())
        };
        let mut reporter = Reporter::new(config);
        run_five(&mut reporter);

        let outcome = reporter.on_end(RunStatus::Passed, 900).unwrap();
        assert_eq!(
            outcome.output,
            RunOutput::Shard(dir.path().join("ortoni-shard-2-of-3.json"))
        );
        assert!(!outcome.should_open);
        assert!(!dir.path().join("ortoni-report.html").exists());
    }

    #[test]
    fn test_handle_event_stream() {
        let dir = tempdir().unwrap();
        let config = ReporterConfig {
            save_history: Some(false),
            open: OpenMode::OnFailure,
            ..config_in(dir.path())
        };
        let mut reporter = Reporter::new(config);

        let events = vec![
            HostEvent::Begin { root_dir: PathBuf::from("/repo") },
            HostEvent::TestBegin { test_id: "chromium-a".to_string() },
            HostEvent::TestEnd {
                test: case("chromium", "a", TestOutcome::Unexpected),
                result: attempt(TestStatus::TimedOut, 0),
            },
        ];
        for event in events {
            assert!(reporter.handle(event).unwrap().is_none());
        }
        let outcome = reporter
            .handle(HostEvent::End { status: RunStatus::Timedout, duration: 50 })
            .unwrap()
            .unwrap();
        assert!(outcome.should_open);
        assert_eq!(outcome.summary.failed, 1);
        assert!(outcome.history_note.is_some());
        assert!(!dir.path().join("ortoni-data-history.sqlite").exists());
    }

    #[test]
    fn test_should_open() {
        assert!(should_open(OpenMode::Always, RunStatus::Passed));
        assert!(!should_open(OpenMode::Never, RunStatus::Failed));
        assert!(should_open(OpenMode::OnFailure, RunStatus::Interrupted));
        assert!(!should_open(OpenMode::OnFailure, RunStatus::Passed));
    }
}
