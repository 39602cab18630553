//! Combining shard files into one result set
//!
//! Merging is tolerant: unreadable shards and unreadable results are skipped
//! with a warning. Only a merge with zero usable shards is an error.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use super::order::{is_shard_file_name, sort_shard_names};
use crate::config::{MergeMode, ReporterConfig};
use crate::error::{OrtoniError, Result};
use crate::model::TestResult;
use crate::store::ProjectSet;

/// Raw contents of one shard file
#[derive(Debug, Clone)]
pub struct ShardInput {
    pub name: String,
    pub contents: String,
}

impl ShardInput {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        ShardInput {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// What one shard contributed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardCount {
    pub name: String,
    pub results: usize,
    pub duration: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedShards {
    pub results: Vec<TestResult>,
    pub project_set: ProjectSet,
    /// Sum of per-shard durations
    pub total_duration: u64,
    /// Longest single shard, an estimate of wall-clock time when shards ran in parallel
    pub max_shard_duration: u64,
    pub merged_config: Map<String, Value>,
    pub merged_meta: BTreeMap<String, String>,
    pub shards: Vec<ShardCount>,
    pub skipped_shards: Vec<String>,
    /// Attempt keys dropped in dedupe mode
    pub duplicates: Vec<String>,
}

impl MergedShards {
    /// Typed view of the merged config with the merged meta applied.
    /// Values that do not fit the config type fall back to defaults.
    pub fn reporter_config(&self) -> ReporterConfig {
        let mut config: ReporterConfig =
            match serde_json::from_value(Value::Object(self.merged_config.clone())) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "Merged shard config is not usable, using defaults");
                    ReporterConfig::default()
                }
            };
        config.meta = self.merged_meta.clone();
        config.shard = None;
        config
    }

    pub fn save_history(&self, explicit: Option<bool>) -> bool {
        resolve_save_history(explicit, &self.merged_config)
    }
}

/// An explicit option wins over the shards' `saveHistory`, which wins over
/// the default of enabled
pub fn resolve_save_history(explicit: Option<bool>, merged_config: &Map<String, Value>) -> bool {
    explicit
        .or_else(|| merged_config.get("saveHistory").and_then(Value::as_bool))
        .unwrap_or(true)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShardMerger {
    mode: MergeMode,
}

struct ParsedShard {
    results: Vec<TestResult>,
    project_set: Vec<String>,
    duration: u64,
    user_config: Option<Map<String, Value>>,
    user_meta: BTreeMap<String, String>,
}

impl ShardMerger {
    pub fn new(mode: MergeMode) -> Self {
        ShardMerger { mode }
    }

    /// Merge every `ortoni-shard-*.json` file directly inside `dir`
    #[tracing::instrument(skip(self, dir), fields(dir = %dir.display(), mode = ?self.mode))]
    pub fn merge_dir(&self, dir: &Path) -> Result<MergedShards> {
        if !dir.is_dir() {
            return Err(OrtoniError::FolderNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut inputs = Vec::new();
        let mut unreadable = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_shard_file_name(&name) {
                continue;
            }
            match fs::read_to_string(entry.path()) {
                Ok(contents) => inputs.push(ShardInput { name, contents }),
                Err(e) => {
                    tracing::warn!(shard = %name, error = %e, "Cannot read shard file, skipping");
                    unreadable.push(name);
                }
            }
        }

        if inputs.is_empty() && unreadable.is_empty() {
            return Err(OrtoniError::NoShardFiles {
                path: dir.to_path_buf(),
            });
        }

        self.merge_inputs(inputs, unreadable)
    }

    /// Merge shard contents, ordered by embedded shard index
    pub fn merge(&self, inputs: Vec<ShardInput>) -> Result<MergedShards> {
        self.merge_inputs(inputs, Vec::new())
    }

    fn merge_inputs(
        &self,
        mut inputs: Vec<ShardInput>,
        skipped: Vec<String>,
    ) -> Result<MergedShards> {
        let start = Instant::now();
        sort_shard_names(&mut inputs, |i| i.name.as_str());

        let mut merged = MergedShards {
            skipped_shards: skipped,
            ..MergedShards::default()
        };
        let mut seen: HashSet<String> = HashSet::new();

        for input in &inputs {
            let shard = match parse_shard(input) {
                Ok(shard) => shard,
                Err(e) => {
                    tracing::warn!(shard = %input.name, error = %e, "Skipping shard");
                    merged.skipped_shards.push(input.name.clone());
                    continue;
                }
            };
            self.absorb(&mut merged, &mut seen, &input.name, shard);
        }

        let valid = merged.shards.len();
        if valid == 0 {
            return Err(OrtoniError::NoValidShards {
                skipped: merged.skipped_shards.len(),
            });
        }
        if !merged.skipped_shards.is_empty() {
            tracing::warn!(
                skipped = ?merged.skipped_shards,
                "Completed merge with {} bad shard(s) skipped",
                merged.skipped_shards.len()
            );
        }

        tracing::info!(
            shards = valid,
            results = merged.results.len(),
            total_duration = merged.total_duration,
            "Merged shards"
        );
        crate::trace_time!(start, "merge_shards", shards = valid);
        Ok(merged)
    }

    fn absorb(
        &self,
        merged: &mut MergedShards,
        seen: &mut HashSet<String>,
        name: &str,
        shard: ParsedShard,
    ) {
        merged.project_set.extend(&shard.project_set);

        let mut kept = 0;
        for record in shard.results {
            if self.mode == MergeMode::Dedupe {
                let key = record.attempt_key();
                if !seen.insert(key.clone()) {
                    tracing::warn!(shard = %name, key = %key, "Duplicate result dropped, keeping first");
                    merged.duplicates.push(key);
                    continue;
                }
            }
            if !record.project_name.is_empty() {
                merged.project_set.insert(&record.project_name);
            }
            merged.results.push(record);
            kept += 1;
        }

        merged.total_duration += shard.duration;
        merged.max_shard_duration = merged.max_shard_duration.max(shard.duration);
        merged.shards.push(ShardCount {
            name: name.to_string(),
            results: kept,
            duration: shard.duration,
        });

        if let Some(config) = shard.user_config {
            for (key, value) in config {
                merge_key(&mut merged.merged_config, key, value, name, "userConfig");
            }
        }
        for (key, value) in shard.user_meta {
            match merged.merged_meta.get(&key) {
                Some(existing) if !existing.is_empty() => {
                    if *existing != value && !value.is_empty() {
                        tracing::warn!(
                            shard = %name,
                            key = %key,
                            kept = %existing,
                            "userMeta mismatch between shards, using first value"
                        );
                    }
                }
                _ => {
                    merged.merged_meta.insert(key, value);
                }
            }
        }
    }
}

/// First non-empty value wins; a later differing value is reported and dropped
fn merge_key(merged: &mut Map<String, Value>, key: String, value: Value, shard: &str, section: &str) {
    match merged.get(&key) {
        Some(existing) if !is_empty_value(existing) => {
            if *existing != value && !is_empty_value(&value) {
                tracing::warn!(
                    shard = %shard,
                    key = %key,
                    kept = %existing,
                    "{} mismatch between shards, using first value",
                    section
                );
            }
        }
        _ => {
            merged.insert(key, value);
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_shard(input: &ShardInput) -> Result<ParsedShard> {
    let value: Value = serde_json::from_str(&input.contents)
        .map_err(|e| OrtoniError::malformed_shard(&input.name, e))?;
    let raw_results = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| OrtoniError::malformed_shard(&input.name, "missing results array"))?;

    let mut results = Vec::with_capacity(raw_results.len());
    for (index, raw) in raw_results.iter().enumerate() {
        match TestResult::deserialize(raw) {
            Ok(record) => results.push(record),
            Err(e) => {
                tracing::warn!(shard = %input.name, index, error = %e, "Skipping unreadable result");
            }
        }
    }

    let project_set = value
        .get("projectSet")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // a reported duration is used as-is (zero included); otherwise sum the tests
    let duration = match value
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d >= 0.0)
    {
        Some(reported) => reported.round() as u64,
        None => raw_results
            .iter()
            .filter_map(|r| r.get("duration").and_then(Value::as_f64))
            .filter(|d| d.is_finite() && *d > 0.0)
            .sum::<f64>()
            .round() as u64,
    };

    let user_config = value.get("userConfig").and_then(Value::as_object).cloned();
    let user_meta = value
        .get("userMeta")
        .and_then(|m| m.get("meta"))
        .and_then(Value::as_object)
        .map(|meta| {
            meta.iter()
                .map(|(k, v)| (k.clone(), value_text(v)))
                .collect()
        })
        .unwrap_or_default();

    Ok(ParsedShard {
        results,
        project_set,
        duration,
        user_config,
        user_meta,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;
    use crate::store::fixtures::{record, retry};
    use serde_json::json;
    use tempfile::tempdir;

    fn results_with_durations(project: &str, durations: &[u64]) -> Vec<Value> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut r = record("a.spec.ts", project, &format!("test {}", i), TestStatus::Passed);
                r.duration = *d;
                serde_json::to_value(r).unwrap()
            })
            .collect()
    }

    fn shard(name: &str, body: Value) -> ShardInput {
        ShardInput::new(name, body.to_string())
    }

    #[test]
    fn test_duration_falls_back_to_test_sum() {
        let a = shard(
            "ortoni-shard-1-of-2.json",
            json!({"results": results_with_durations("chromium", &[400, 400]), "projectSet": ["chromium"], "duration": 1000}),
        );
        let b = shard(
            "ortoni-shard-2-of-2.json",
            json!({"results": results_with_durations("firefox", &[100, 200, 300]), "projectSet": ["firefox"]}),
        );

        let merged = ShardMerger::default().merge(vec![b, a]).unwrap();
        assert_eq!(merged.total_duration, 1600);
        assert_eq!(merged.max_shard_duration, 1000);
        assert_eq!(merged.results.len(), 5);
        assert_eq!(merged.project_set.names(), &["chromium", "firefox"]);
        assert_eq!(merged.shards[0].name, "ortoni-shard-1-of-2.json");
        assert_eq!(merged.shards[1].duration, 600);
    }

    #[test]
    fn test_zero_and_invalid_durations() {
        let zero = shard(
            "ortoni-shard-1-of-2.json",
            json!({"results": results_with_durations("p", &[50]), "duration": 0}),
        );
        let negative = shard(
            "ortoni-shard-2-of-2.json",
            json!({"results": results_with_durations("p", &[70]), "duration": -5}),
        );
        let merged = ShardMerger::default().merge(vec![zero, negative]).unwrap();
        assert_eq!(merged.shards[0].duration, 0);
        assert_eq!(merged.shards[1].duration, 70);
        assert_eq!(merged.total_duration, 70);
    }

    #[test]
    fn test_append_mode_keeps_duplicates() {
        let body = json!({"results": results_with_durations("p", &[10, 20, 30]), "duration": 60});
        let single = ShardMerger::new(MergeMode::Append)
            .merge(vec![shard("ortoni-shard-1-of-1.json", body.clone())])
            .unwrap();
        let doubled = ShardMerger::new(MergeMode::Append)
            .merge(vec![
                shard("ortoni-shard-1-of-2.json", body.clone()),
                shard("ortoni-shard-2-of-2.json", body.clone()),
            ])
            .unwrap();

        assert_eq!(doubled.results.len(), 2 * single.results.len());
        assert!(doubled.duplicates.is_empty());

        let direct: Vec<TestResult> = serde_json::from_value(body["results"].clone()).unwrap();
        assert_eq!(single.results, direct);
    }

    #[test]
    fn test_dedupe_mode_keeps_first_attempt() {
        let mut first = record("a.spec.ts", "p", "login", TestStatus::Failed);
        first.errors = vec!["from shard one".to_string()];
        let second = record("a.spec.ts", "p", "login", TestStatus::Passed);
        let retried = retry(record("a.spec.ts", "p", "login", TestStatus::Passed), 1);

        let merged = ShardMerger::new(MergeMode::Dedupe)
            .merge(vec![
                shard("ortoni-shard-1-of-2.json", json!({"results": [first]})),
                shard("ortoni-shard-2-of-2.json", json!({"results": [second, retried]})),
            ])
            .unwrap();

        assert_eq!(merged.results.len(), 2);
        assert_eq!(merged.results[0].errors, vec!["from shard one"]);
        assert_eq!(merged.results[1].retry_attempt_count, 1);
        assert_eq!(merged.duplicates, vec![first.attempt_key()]);
        assert_eq!(merged.shards[1].results, 1);
    }

    #[test]
    fn test_malformed_shards_are_skipped() {
        let good = shard(
            "ortoni-shard-1-of-3.json",
            json!({"results": results_with_durations("p", &[10])}),
        );
        let not_json = ShardInput::new("ortoni-shard-2-of-3.json", "{ not json");
        let no_results = shard("ortoni-shard-3-of-3.json", json!({"projectSet": ["p"]}));

        let merged = ShardMerger::default()
            .merge(vec![not_json, good, no_results])
            .unwrap();
        assert_eq!(merged.results.len(), 1);
        assert_eq!(
            merged.skipped_shards,
            vec!["ortoni-shard-2-of-3.json", "ortoni-shard-3-of-3.json"]
        );
    }

    #[test]
    fn test_unreadable_result_entries_are_dropped() {
        let mut results = results_with_durations("p", &[10, 20]);
        results.insert(1, json!({"title": "no status or id"}));
        let merged = ShardMerger::default()
            .merge(vec![shard("ortoni-shard-1-of-1.json", json!({"results": results}))])
            .unwrap();
        assert_eq!(merged.results.len(), 2);
    }

    #[test]
    fn test_fractional_result_durations_are_kept() {
        let mut results = results_with_durations("p", &[100]);
        let mut slow = results[0].clone();
        slow["testId"] = json!("a.spec.ts:p:slow");
        slow["duration"] = json!(250.5);
        results.push(slow);

        let merged = ShardMerger::default()
            .merge(vec![shard("ortoni-shard-1-of-1.json", json!({"results": results}))])
            .unwrap();
        assert_eq!(merged.results.len(), 2);
        assert_eq!(merged.results[1].duration, 251);
        assert_eq!(merged.shards[0].results, 2);
        assert_eq!(merged.total_duration, 351);
    }

    #[test]
    fn test_zero_valid_shards_is_fatal() {
        let err = ShardMerger::default()
            .merge(vec![ShardInput::new("ortoni-shard-1-of-1.json", "[]")])
            .unwrap_err();
        assert!(matches!(err, OrtoniError::NoValidShards { skipped: 1 }));
        assert_eq!(err.exit_code(), crate::error::ExitCode::Failure);

        let err = ShardMerger::default().merge(Vec::new()).unwrap_err();
        assert!(matches!(err, OrtoniError::NoValidShards { skipped: 0 }));
    }

    #[test]
    fn test_config_first_non_empty_wins() {
        let a = shard(
            "ortoni-shard-1-of-2.json",
            json!({
                "results": [],
                "userConfig": {"title": "Nightly", "authorName": "", "saveHistory": false},
                "userMeta": {"meta": {"branch": "main"}}
            }),
        );
        let b = shard(
            "ortoni-shard-2-of-2.json",
            json!({
                "results": [],
                "userConfig": {"title": "Other", "authorName": "QA", "showProject": true},
                "userMeta": {"meta": {"branch": "dev", "build": "42"}}
            }),
        );

        let merged = ShardMerger::default().merge(vec![a, b]).unwrap();
        assert_eq!(merged.merged_config["title"], "Nightly");
        assert_eq!(merged.merged_config["authorName"], "QA");
        assert_eq!(merged.merged_config["showProject"], true);
        assert_eq!(merged.merged_meta["branch"], "main");
        assert_eq!(merged.merged_meta["build"], "42");

        let config = merged.reporter_config();
        assert_eq!(config.title.as_deref(), Some("Nightly"));
        assert!(config.show_project);
        assert_eq!(config.meta.len(), 2);
        assert!(!merged.save_history(None));
        assert!(merged.save_history(Some(true)));
    }

    #[test]
    fn test_save_history_priority() {
        let empty = Map::new();
        assert!(resolve_save_history(None, &empty));
        assert!(!resolve_save_history(Some(false), &empty));

        let mut disabled = Map::new();
        disabled.insert("saveHistory".to_string(), Value::Bool(false));
        assert!(!resolve_save_history(None, &disabled));
        assert!(resolve_save_history(Some(true), &disabled));
    }

    #[test]
    fn test_merge_dir_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            ShardMerger::default().merge_dir(&missing),
            Err(OrtoniError::FolderNotFound { .. })
        ));

        fs::write(dir.path().join("ortoni-report.html"), "<html>").unwrap();
        assert!(matches!(
            ShardMerger::default().merge_dir(dir.path()),
            Err(OrtoniError::NoShardFiles { .. })
        ));
    }

    #[test]
    fn test_merge_dir_reads_shards_in_index_order() {
        let dir = tempdir().unwrap();
        for (i, project) in [(10, "ten"), (2, "two"), (1, "one")] {
            let body = json!({"results": results_with_durations(project, &[5]), "projectSet": [project]});
            fs::write(
                dir.path().join(format!("ortoni-shard-{}-of-10.json", i)),
                body.to_string(),
            )
            .unwrap();
        }
        fs::create_dir(dir.path().join("ortoni-shard-dir.json")).unwrap();

        let merged = ShardMerger::default().merge_dir(dir.path()).unwrap();
        assert_eq!(merged.project_set.names(), &["one", "two", "ten"]);
        assert_eq!(merged.total_duration, 15);
    }
}
