//! Canonical per-attempt result record

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::deserialize_millis;

/// Final status of one test attempt
///
/// `Flaky` never comes from the host directly; it replaces the attempt's own
/// status when the test's overall outcome is flaky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
    Flaky,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::TimedOut => "timedOut",
            TestStatus::Skipped => "skipped",
            TestStatus::Interrupted => "interrupted",
            TestStatus::Flaky => "flaky",
        }
    }

    /// Failed or timed out
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::TimedOut)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Passed,
    Failed,
}

/// One node of a step tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Rendered error snippet, empty for passing steps
    pub snippet: String,
    /// `relative/file:line:column`, only set for failing steps
    pub location: String,
    #[serde(deserialize_with = "deserialize_millis")]
    pub duration: u64,
    pub status: StepStatus,
    pub steps: Vec<Step>,
}

impl Step {
    /// Number of nodes in this subtree, the step itself included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(step) = stack.pop() {
            count += 1;
            stack.extend(step.steps.iter());
        }
        count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Canonical record for one test attempt
///
/// Created once by the normalizer and never mutated afterwards. Shard files
/// carry these records verbatim, so every field tolerates being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// `filePath:projectName:title`, stable across runs and retries
    pub test_id: String,
    /// Host identifier of the test case
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub suite: String,
    #[serde(default)]
    pub suite_hierarchy: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub test_tags: Vec<String>,
    #[serde(default)]
    pub suite_tags: Vec<String>,
    pub status: TestStatus,
    #[serde(default)]
    pub retry_attempt_count: u32,
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub duration: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub logs: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
}

impl TestResult {
    pub fn is_retry(&self) -> bool {
        self.retry_attempt_count > 0
    }

    /// Key identifying one attempt of one test, used to drop duplicate
    /// attempts when merging overlapping shards
    pub fn attempt_key(&self) -> String {
        format!("{}|{}|{}", self.test_id, self.key, self.retry_attempt_count)
    }

    /// Errors joined for persistence
    pub fn error_message(&self) -> String {
        self.errors.join("\n")
    }
}
