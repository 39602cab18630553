//! Conversion of raw host events into canonical `TestResult` records

pub mod ansi;
pub mod attachments;
pub mod paths;
pub mod steps;
pub mod tags;

use std::path::PathBuf;

use crate::config::ReporterConfig;
use crate::model::{AttemptResult, TestCaseInfo, TestOutcome, TestResult, TestStatus};
use crate::store::ProjectSet;

use ansi::render_text;
use attachments::{collect_attachments, AttachmentOptions};
use paths::normalize_file_path;
use steps::convert_steps;
use tags::{extract_tags, merge_tags};

/// Title path positions: `["", project, file, describe..., title]`
const PROJECT_INDEX: usize = 1;
const FILE_INDEX: usize = 2;
const FIRST_SUITE_INDEX: usize = 3;

/// Builds one `TestResult` per test attempt
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    project_root: PathBuf,
    include_logs: bool,
    attachments: AttachmentOptions,
}

impl ResultNormalizer {
    pub fn new(project_root: impl Into<PathBuf>, config: &ReporterConfig) -> Self {
        Self {
            project_root: project_root.into(),
            include_logs: config.std_io,
            attachments: AttachmentOptions {
                base64_image: config.base64_image,
                report_folder: config.folder(),
            },
        }
    }

    /// Normalize one completed attempt.
    ///
    /// Adds the test's project to `projects`. Attachment failures are logged
    /// and the attachment omitted; this never fails.
    pub fn normalize(
        &self,
        test: &TestCaseInfo,
        result: &AttemptResult,
        projects: &mut ProjectSet,
    ) -> TestResult {
        let status = if test.outcome == TestOutcome::Flaky {
            TestStatus::Flaky
        } else {
            result.status
        };

        let project_name = title_part(test, PROJECT_INDEX).to_string();
        projects.insert(&project_name);

        let raw_file = match title_part(test, FILE_INDEX) {
            "" => test.location.file.to_string_lossy().into_owned(),
            file => file.to_string(),
        };
        let file_path = normalize_file_path(&raw_file);

        let (title, mut test_tags) = extract_tags(&test.title);
        merge_tags(&mut test_tags, &test.tags);

        let describes = describe_titles(test);
        let (suite, suite_tags) = describes
            .first()
            .map(|s| extract_tags(s))
            .unwrap_or_default();
        let suite_hierarchy = describes
            .iter()
            .map(|s| extract_tags(s).0)
            .collect::<Vec<_>>()
            .join(" > ");

        let converted = convert_steps(&result.steps, &self.project_root);
        if converted.truncated > 0 {
            tracing::warn!(
                test = %test.id,
                dropped = converted.truncated,
                "Step tree exceeds depth limit, nested steps dropped"
            );
        }

        let errors: Vec<String> = result
            .errors
            .iter()
            .map(|e| render_text(e.text()))
            .collect();
        if let Some(first) = result.errors.first() {
            let plain = strip_ansi_escapes::strip_str(first.text());
            tracing::debug!(test = %test.id, error = %plain, "Attempt failed");
        }

        let logs = if self.include_logs {
            let lines: Vec<&str> = result
                .stdout
                .iter()
                .chain(result.stderr.iter())
                .map(String::as_str)
                .collect();
            render_text(&lines.join("\n"))
        } else {
            String::new()
        };

        let attachments =
            collect_attachments(&result.attachments, &test.id, result.retry, &self.attachments);

        TestResult {
            test_id: format!("{}:{}:{}", file_path, project_name, title),
            key: test.id.clone(),
            location: format!(
                "{}:{}:{}",
                file_path, test.location.line, test.location.column
            ),
            project_name,
            suite,
            suite_hierarchy,
            title,
            test_tags,
            suite_tags,
            status,
            retry_attempt_count: result.retry,
            duration: result.duration,
            errors,
            steps: converted.steps,
            logs,
            file_path,
            annotations: test.annotations.clone(),
            screenshots: attachments.screenshots,
            trace_path: attachments.trace_path,
            video_path: attachments.video_path,
        }
    }
}

fn title_part(test: &TestCaseInfo, index: usize) -> &str {
    test.title_path
        .get(index)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Describe-block titles between the file and the test title
fn describe_titles(test: &TestCaseInfo) -> &[String] {
    let len = test.title_path.len();
    if len > FIRST_SUITE_INDEX + 1 {
        &test.title_path[FIRST_SUITE_INDEX..len - 1]
    } else {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorInfo, SourceLocation};
    use tempfile::tempdir;

    fn case(title: &str, title_path: &[&str], outcome: TestOutcome) -> TestCaseInfo {
        TestCaseInfo {
            id: "abc123".to_string(),
            title: title.to_string(),
            title_path: title_path.iter().map(|s| s.to_string()).collect(),
            location: SourceLocation {
                file: PathBuf::from("/work/tests/login.spec.ts"),
                line: 10,
                column: 5,
            },
            outcome,
            ..Default::default()
        }
    }

    fn normalizer() -> ResultNormalizer {
        ResultNormalizer::new("/work", &ReporterConfig::default())
    }

    #[test]
    fn test_flaky_outcome_overrides_attempt_status() {
        let test = case(
            "logs in",
            &["", "chromium", "tests/login.spec.ts", "Auth", "logs in"],
            TestOutcome::Flaky,
        );
        let mut projects = ProjectSet::default();

        let first = normalizer().normalize(&test, &AttemptResult::new(TestStatus::Failed), &mut projects);
        assert_eq!(first.status, TestStatus::Flaky);

        let mut retry = AttemptResult::new(TestStatus::Passed);
        retry.retry = 1;
        let second = normalizer().normalize(&test, &retry, &mut projects);
        assert_eq!(second.status, TestStatus::Flaky);
        assert!(second.is_retry());
        assert_eq!(first.test_id, second.test_id);
    }

    #[test]
    fn test_status_passes_through() {
        let test = case(
            "logs in",
            &["", "chromium", "login.spec.ts", "Auth", "logs in"],
            TestOutcome::Unexpected,
        );
        let mut projects = ProjectSet::default();
        let record =
            normalizer().normalize(&test, &AttemptResult::new(TestStatus::TimedOut), &mut projects);
        assert_eq!(record.status, TestStatus::TimedOut);
    }

    #[test]
    fn test_identity_tags_and_location() {
        let mut test = case(
            "@smoke @regression Login test",
            &[
                "",
                "firefox",
                r"tests\auth\login.spec.ts",
                "Auth @critical",
                "Nested",
                "@smoke @regression Login test",
            ],
            TestOutcome::Expected,
        );
        test.tags = vec!["@smoke".to_string(), "@api".to_string()];
        let mut projects = ProjectSet::default();

        let record =
            normalizer().normalize(&test, &AttemptResult::new(TestStatus::Passed), &mut projects);

        assert_eq!(record.title, "Login test");
        assert_eq!(record.test_tags, vec!["@smoke", "@regression", "@api"]);
        assert_eq!(record.suite, "Auth");
        assert_eq!(record.suite_tags, vec!["@critical"]);
        assert_eq!(record.suite_hierarchy, "Auth > Nested");
        assert_eq!(record.file_path, "login.spec.ts");
        assert_eq!(record.test_id, "login.spec.ts:firefox:Login test");
        assert_eq!(record.location, "login.spec.ts:10:5");
        assert_eq!(record.key, "abc123");
        assert_eq!(projects.names(), &["firefox".to_string()]);
    }

    #[test]
    fn test_test_without_describe_has_empty_suite() {
        let test = case(
            "standalone",
            &["", "chromium", "a.spec.ts", "standalone"],
            TestOutcome::Expected,
        );
        let mut projects = ProjectSet::default();
        let record =
            normalizer().normalize(&test, &AttemptResult::new(TestStatus::Passed), &mut projects);
        assert_eq!(record.suite, "");
        assert_eq!(record.suite_hierarchy, "");
    }

    #[test]
    fn test_errors_and_logs_rendered() {
        let test = case("x", &["", "p", "a.spec.ts", "S", "x"], TestOutcome::Unexpected);
        let mut result = AttemptResult::new(TestStatus::Failed);
        result.errors = vec![ErrorInfo {
            message: Some("Expected <b>".to_string()),
            stack: None,
            snippet: None,
        }];
        result.stdout = vec!["\x1b[32mok\x1b[0m".to_string()];
        result.stderr = vec!["warn & more".to_string()];
        let mut projects = ProjectSet::default();

        let record = normalizer().normalize(&test, &result, &mut projects);
        assert_eq!(record.errors, vec!["Expected &lt;b&gt;"]);
        assert_eq!(
            record.logs,
            "<span style=\"color:#0A0\">ok</span>\nwarn &amp; more"
        );
        assert_eq!(record.error_message(), "Expected &lt;b&gt;");
    }

    #[test]
    fn test_logs_omitted_without_std_io() {
        let config = ReporterConfig {
            std_io: false,
            ..Default::default()
        };
        let test = case("x", &["", "p", "a.spec.ts", "S", "x"], TestOutcome::Expected);
        let mut result = AttemptResult::new(TestStatus::Passed);
        result.stdout = vec!["noise".to_string()];
        let mut projects = ProjectSet::default();

        let record = ResultNormalizer::new("/work", &config).normalize(&test, &result, &mut projects);
        assert_eq!(record.logs, "");
    }

    #[test]
    fn test_unreadable_attachment_still_emits_record() {
        let dir = tempdir().unwrap();
        let config = ReporterConfig {
            folder_path: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let test = case("x", &["", "p", "a.spec.ts", "S", "x"], TestOutcome::Unexpected);
        let mut result = AttemptResult::new(TestStatus::Failed);
        result.duration = 0;
        result.attachments = vec![crate::model::RawAttachment {
            name: "screenshot".to_string(),
            content_type: "image/png".to_string(),
            path: Some(dir.path().join("gone.png")),
            body: None,
        }];
        let mut projects = ProjectSet::default();

        let record = ResultNormalizer::new("/work", &config).normalize(&test, &result, &mut projects);
        assert!(record.screenshots.is_empty());
        assert_eq!(record.status, TestStatus::Failed);
        assert_eq!(record.duration, 0);
    }
}
