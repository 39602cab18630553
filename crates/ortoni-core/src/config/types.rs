//! Configuration type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FOLDER_PATH: &str = "ortoni-report";
pub const DEFAULT_FILENAME: &str = "ortoni-report.html";
pub const DEFAULT_TITLE: &str = "Ortoni Playwright Test Report";

/// Reporter configuration
///
/// Every key is optional. Unknown keys are ignored so configs written for
/// newer or older reporters still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterConfig {
    /// When to open the report after a run
    #[serde(default)]
    pub open: OpenMode,

    /// Add the project level to grouped results
    #[serde(default)]
    pub show_project: bool,

    /// Inline screenshots as base64 data URIs instead of copying files
    #[serde(default)]
    pub base64_image: bool,

    /// Report output folder
    #[serde(default = "default_folder_path")]
    pub folder_path: String,

    /// Report file name inside `folder_path`
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Persist run history. `None` means "not specified" and resolves to enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_history: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_theme: Option<Theme>,

    /// Logo path, relative to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    /// Include captured stdout/stderr in results
    #[serde(default = "default_std_io", rename = "stdIO")]
    pub std_io: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// Free-form metadata shown in the report header
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    /// Result combination policy for shard merging
    #[serde(default)]
    pub merge_mode: MergeMode,

    /// Set when this run is one shard of a larger run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardDescriptor>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            open: OpenMode::default(),
            show_project: false,
            base64_image: false,
            folder_path: default_folder_path(),
            filename: default_filename(),
            save_history: None,
            title: None,
            project_name: None,
            author_name: None,
            test_type: None,
            preferred_theme: None,
            logo: None,
            std_io: default_std_io(),
            chart_type: None,
            meta: BTreeMap::new(),
            merge_mode: MergeMode::default(),
            shard: None,
        }
    }
}

/// When the report is opened after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenMode {
    Always,
    #[default]
    Never,
    OnFailure,
}

/// Preferred report theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// How results from several shards are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Keep every result from every shard, duplicates included
    #[default]
    Append,
    /// Keep the first result per test attempt, drop later duplicates
    Dedupe,
}

/// Position of this run within a sharded run (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDescriptor {
    pub current: u32,
    pub total: u32,
}

fn default_folder_path() -> String {
    DEFAULT_FOLDER_PATH.to_string()
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

fn default_std_io() -> bool {
    true
}
