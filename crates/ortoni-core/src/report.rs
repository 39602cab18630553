//! Rendering payload and the HTML shell that carries it
//!
//! The payload is everything a template renderer needs. The shell written
//! here only embeds it as JSON; styling and widgets live elsewhere.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::aggregate::{all_tags, group, project_stats, summarize, GroupedResults, ProjectStats, RunSummary};
use crate::config::{ReporterConfig, Theme};
use crate::db::HistoryEntry;
use crate::error::{OrtoniError, Result};
use crate::history::{ChartTrendData, HistoryAnalytics, HistoryStore, DEFAULT_HISTORY_LIMIT, DEFAULT_TREND_LIMIT};
use crate::model::TestResult;
use crate::normalize::ansi::escape_html;
use crate::store::{is_counted, ProjectSet};
use crate::time::{format_local, format_run_date};

/// Element id of the embedded payload
pub const PAYLOAD_ELEMENT_ID: &str = "ortoni-report-data";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestHistory {
    pub test_id: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultSection {
    pub tests: GroupedResults,
    pub test_histories: Vec<TestHistory>,
    pub all_tags: Vec<String>,
    pub project_set: ProjectSet,
}

/// Descriptive config values shown in the report header
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    pub show_project: bool,
    pub chart_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub report_data: HistoryAnalytics,
    pub chart_trend_data: ChartTrendData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub utc_run_date: String,
    pub local_run_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub summary: RunSummary,
    pub test_result: TestResultSection,
    pub project_stats: Vec<ProjectStats>,
    pub user_config: UserConfig,
    pub preferences: Preferences,
    pub analytics: Analytics,
    pub run: RunInfo,
    /// Why history sections are empty, when they are
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_note: Option<String>,
}

/// Compute the payload for a run's results.
///
/// `results` is every recorded attempt in arrival order. Queries go through
/// `history`, which answers with empty data when unavailable.
pub fn build_report(
    config: &ReporterConfig,
    results: &[TestResult],
    projects: &ProjectSet,
    total_duration_ms: u64,
    history: &mut HistoryStore,
) -> ReportPayload {
    let filtered: Vec<&TestResult> = results.iter().filter(|&r| is_counted(r)).collect();
    let summary = summarize(results, &filtered).with_duration(total_duration_ms);

    let mut seen = HashSet::new();
    let test_histories = results
        .iter()
        .filter(|r| seen.insert(r.test_id.as_str()))
        .map(|r| TestHistory {
            test_id: r.test_id.clone(),
            history: history.get_history(&r.test_id, DEFAULT_HISTORY_LIMIT),
        })
        .collect();

    let analytics = Analytics {
        report_data: history.analytics(),
        chart_trend_data: history.chart_trend_data(DEFAULT_TREND_LIMIT),
    };

    let utc_run_date = format_run_date(Utc::now());
    ReportPayload {
        project_stats: project_stats(results, &filtered, projects),
        test_result: TestResultSection {
            tests: group(results, config.show_project),
            test_histories,
            all_tags: all_tags(results),
            project_set: projects.clone(),
        },
        summary,
        user_config: UserConfig {
            title: config.display_title().to_string(),
            project_name: config.project_name.clone(),
            author_name: config.author_name.clone(),
            test_type: config.test_type.clone(),
            meta: config.meta.clone(),
        },
        preferences: Preferences {
            theme: config.preferred_theme,
            show_project: config.show_project,
            chart_type: config.chart_type.clone().unwrap_or_else(|| "pie".to_string()),
            logo: config.logo.clone(),
        },
        analytics,
        run: RunInfo {
            local_run_date: format_local(&utc_run_date),
            utc_run_date,
        },
        history_note: history.note().map(str::to_string),
    }
}

/// Minimal HTML document embedding the payload as JSON
pub fn render_html(title: &str, payload: &ReportPayload) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    // keep the script element from being closed by payload text
    let json = json.replace("</", "<\\/");

    let mut html = String::with_capacity(json.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", escape_html(title)));
    if let Some(note) = &payload.history_note {
        html.push_str(&format!("<p class=\"history-note\">{}</p>\n", escape_html(note)));
    }
    html.push_str("<div id=\"app\"></div>\n");
    html.push_str(&format!(
        "<script id=\"{}\" type=\"application/json\">{}</script>\n",
        PAYLOAD_ELEMENT_ID, json
    ));
    html.push_str("</body>\n</html>\n");
    Ok(html)
}

/// Write the report file, creating its folder
pub fn write_report(path: &Path, title: &str, payload: &ReportPayload) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| OrtoniError::io_operation("create directory", parent.display(), e))?;
    }
    let html = render_html(title, payload)?;
    fs::write(path, html).map_err(|e| OrtoniError::io_operation("write report", path.display(), e))?;
    tracing::info!(path = %path.display(), "Report written");
    Ok(())
}

/// Extract the embedded payload from a written report
pub fn read_payload(html: &str) -> Option<serde_json::Value> {
    let open = format!("<script id=\"{}\" type=\"application/json\">", PAYLOAD_ELEMENT_ID);
    let start = html.find(&open)? + open.len();
    let end = start + html[start..].find("</script>")?;
    serde_json::from_str(&html[start..end]).ok()
}
