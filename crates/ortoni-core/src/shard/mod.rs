//! Partial result sets from sharded runs and their merging

pub mod merge;
pub mod order;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ReporterConfig, ShardDescriptor};
use crate::error::{OrtoniError, Result};
use crate::model::TestResult;
use crate::store::ProjectSet;

pub use merge::{resolve_save_history, MergedShards, ShardInput, ShardMerger};
pub use order::{is_shard_file_name, shard_file_name, shard_index, sort_shard_names};

/// User-supplied metadata carried next to the config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMeta {
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

/// One shard's partial run as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardFile {
    pub results: Vec<TestResult>,
    pub project_set: ProjectSet,
    /// Wall-clock duration of the shard in milliseconds
    #[serde(deserialize_with = "crate::time::deserialize_millis")]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_meta: Option<UserMeta>,
}

impl ShardFile {
    pub fn new(
        results: Vec<TestResult>,
        project_set: ProjectSet,
        duration: u64,
        config: &ReporterConfig,
    ) -> Result<Self> {
        let mut user_config = serde_json::to_value(config)?;
        // meta travels separately in userMeta; the shard descriptor is per shard
        if let Some(map) = user_config.as_object_mut() {
            map.remove("meta");
            map.remove("shard");
        }

        Ok(ShardFile {
            results,
            project_set,
            duration,
            user_config: Some(user_config),
            user_meta: Some(UserMeta {
                meta: config.meta.clone(),
            }),
        })
    }

    /// Write as `folder/ortoni-shard-<current>-of-<total>.json`
    pub fn write(&self, folder: &Path, shard: &ShardDescriptor) -> Result<PathBuf> {
        fs::create_dir_all(folder)
            .map_err(|e| OrtoniError::io_operation("create directory", folder.display(), e))?;

        let path = folder.join(shard_file_name(shard));
        let json = serde_json::to_string(self)?;
        fs::write(&path, json)
            .map_err(|e| OrtoniError::io_operation("write shard", path.display(), e))?;

        tracing::info!(
            path = %path.display(),
            results = self.results.len(),
            "Wrote shard file"
        );
        Ok(path)
    }
}
