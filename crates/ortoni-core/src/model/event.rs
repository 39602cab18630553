//! Lifecycle events emitted by the test host
//!
//! The host delivers callbacks one at a time. When replayed from a file each
//! line of a JSON Lines stream is one `HostEvent`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::result::{Annotation, TestStatus};
use crate::time::deserialize_millis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    #[serde(rename_all = "camelCase")]
    Begin { root_dir: PathBuf },
    #[serde(rename_all = "camelCase")]
    TestBegin { test_id: String },
    TestEnd {
        test: TestCaseInfo,
        result: AttemptResult,
    },
    End {
        status: RunStatus,
        #[serde(default, deserialize_with = "deserialize_millis")]
        duration: u64,
    },
}

/// Aggregate outcome of a test across all of its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    #[default]
    Expected,
    Unexpected,
    Flaky,
    Skipped,
}

/// Final status of the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
    #[serde(alias = "timedOut")]
    Timedout,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// Static description of a test case
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCaseInfo {
    pub id: String,
    pub title: String,
    /// `["", project, file, describe..., title]`
    pub title_path: Vec<String>,
    pub location: SourceLocation,
    pub outcome: TestOutcome,
    pub tags: Vec<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorInfo {
    pub message: Option<String>,
    pub stack: Option<String>,
    pub snippet: Option<String>,
}

impl ErrorInfo {
    /// Stack when present, otherwise the message
    pub fn text(&self) -> &str {
        self.stack
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStep {
    pub title: String,
    pub category: Option<String>,
    #[serde(deserialize_with = "deserialize_millis")]
    pub duration: u64,
    pub location: Option<SourceLocation>,
    pub error: Option<ErrorInfo>,
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAttachment {
    pub name: String,
    pub content_type: String,
    pub path: Option<PathBuf>,
    /// Inline payload, base64 encoded
    pub body: Option<String>,
}

/// Outcome of one attempt of a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    #[serde(default)]
    pub retry: u32,
    pub status: TestStatus,
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub duration: u64,
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default)]
    pub stderr: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
}

impl AttemptResult {
    pub fn new(status: TestStatus) -> Self {
        Self {
            retry: 0,
            status,
            duration: 0,
            errors: Vec::new(),
            steps: Vec::new(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            attachments: Vec::new(),
        }
    }
}
