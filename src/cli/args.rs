//! Argument structs for ortoni subcommands

use std::path::PathBuf;

use clap::Args;

use ortoni_core::config::DEFAULT_FOLDER_PATH;
use ortoni_core::history::{DEFAULT_HISTORY_LIMIT, DEFAULT_TREND_LIMIT};

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// JSON Lines event stream, or `-` for stdin
    #[arg(long, short)]
    pub events: PathBuf,

    /// Reporter configuration file (.toml or .json)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Report folder, overriding the configured one
    #[arg(long)]
    pub folder: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Folder containing the shard files
    #[arg(long, short, default_value = DEFAULT_FOLDER_PATH)]
    pub dir: PathBuf,

    /// File name of the merged report
    #[arg(long, short)]
    pub file: Option<String>,

    /// Persist the merged run to history, regardless of shard settings
    #[arg(long, conflicts_with = "no_save_history")]
    pub save_history: bool,

    /// Do not persist the merged run to history
    #[arg(long)]
    pub no_save_history: bool,

    /// Keep only the first result per test attempt across shards
    #[arg(long)]
    pub dedupe: bool,

    /// Configuration file providing `mergeMode`
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl MergeArgs {
    /// `None` when neither flag was given
    pub fn save_history_override(&self) -> Option<bool> {
        match (self.save_history, self.no_save_history) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Test id (`file:project:title`)
    pub test_id: String,

    /// Report folder holding the history database
    #[arg(long, short, default_value = DEFAULT_FOLDER_PATH)]
    pub dir: PathBuf,

    /// Maximum number of runs to show
    #[arg(long, short, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct TrendsArgs {
    /// Report folder holding the history database
    #[arg(long, short, default_value = DEFAULT_FOLDER_PATH)]
    pub dir: PathBuf,

    /// Maximum number of runs to include
    #[arg(long, short, default_value_t = DEFAULT_TREND_LIMIT)]
    pub limit: usize,
}
