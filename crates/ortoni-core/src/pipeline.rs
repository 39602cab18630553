//! End-of-run processing shared by live runs and shard merges:
//! persist history, build the payload, write the report.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::aggregate::{summarize, RunSummary};
use crate::config::{MergeMode, ReporterConfig, DEFAULT_FOLDER_PATH};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::model::TestResult;
use crate::report::{build_report, write_report};
use crate::shard::merge::ShardCount;
use crate::shard::ShardMerger;
use crate::store::{is_counted, ProjectSet};

const HISTORY_DISABLED_NOTE: &str = "history disabled (saveHistory is false)";

/// History for a run: opened when enabled, otherwise an explanatory empty store
pub fn open_history(config: &ReporterConfig, save_history: bool) -> HistoryStore {
    if save_history {
        HistoryStore::initialize(&config.history_db_path())
    } else {
        tracing::info!("Skipping history save (saveHistory = false)");
        HistoryStore::disabled(HISTORY_DISABLED_NOTE)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub report_path: PathBuf,
    pub summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_note: Option<String>,
    /// Id of the run recorded in history, if it was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
}

/// Persist the run, then write the report. History problems never fail this;
/// only writing the report can.
pub fn generate_report(
    config: &ReporterConfig,
    results: &[TestResult],
    projects: &ProjectSet,
    total_duration_ms: u64,
    mut history: HistoryStore,
) -> Result<GeneratedReport> {
    let start = Instant::now();

    let filtered: Vec<&TestResult> = results.iter().filter(|&r| is_counted(r)).collect();
    let summary = summarize(results, &filtered).with_duration(total_duration_ms);

    let run_id = history.record_run(&summary, results);

    let payload = build_report(config, results, projects, total_duration_ms, &mut history);
    history.close();

    let report_path = config.report_path();
    write_report(&report_path, config.display_title(), &payload)?;
    crate::trace_time!(start, "generate_report", results = results.len());

    Ok(GeneratedReport {
        report_path,
        summary: payload.summary,
        history_note: payload.history_note,
        run_id,
    })
}

/// Options for merging shard files into a final report
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub dir: PathBuf,
    /// Report file name; defaults to the merged config's, then `ortoni-report.html`
    pub file: Option<String>,
    /// Overrides any `saveHistory` carried by the shards
    pub save_history: Option<bool>,
    pub mode: MergeMode,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            dir: PathBuf::from(DEFAULT_FOLDER_PATH),
            file: None,
            save_history: None,
            mode: MergeMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub report: GeneratedReport,
    pub mode: MergeMode,
    pub shards: Vec<ShardCount>,
    pub skipped_shards: Vec<String>,
    pub total_results: usize,
    pub duplicates_dropped: usize,
    pub total_duration: u64,
    pub max_shard_duration: u64,
    pub save_history: bool,
}

/// Merge every shard in `options.dir` and write the final report there
pub fn merge_report(options: &MergeOptions) -> Result<MergeOutcome> {
    tracing::info!(dir = %options.dir.display(), "Merging shard files");
    let merged = ShardMerger::new(options.mode).merge_dir(&options.dir)?;

    let mut config = merged.reporter_config();
    config.folder_path = options.dir.to_string_lossy().into_owned();
    if let Some(file) = &options.file {
        config.filename = file.clone();
    }

    let save_history = merged.save_history(options.save_history);
    let history = open_history(&config, save_history);
    let report = generate_report(
        &config,
        &merged.results,
        &merged.project_set,
        merged.total_duration,
        history,
    )?;

    Ok(MergeOutcome {
        report,
        mode: options.mode,
        total_results: merged.results.len(),
        duplicates_dropped: merged.duplicates.len(),
        shards: merged.shards,
        skipped_shards: merged.skipped_shards,
        total_duration: merged.total_duration,
        max_shard_duration: merged.max_shard_duration,
        save_history,
    })
}
