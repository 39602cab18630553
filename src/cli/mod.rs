//! CLI argument parsing for ortoni
//!
//! Global flags: --format, --quiet, --verbose, --log-level, --log-json

pub mod args;
pub mod output;

use clap::{Parser, Subcommand};

pub use args::{HistoryArgs, MergeArgs, ReportArgs, TrendsArgs};
pub use output::OutputFormat;

/// Ortoni - test-run result aggregation and report generation
#[derive(Parser, Debug)]
#[command(name = "ortoni")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "ORTONI_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a test event stream and write the report (or a shard file)
    Report(ReportArgs),

    /// Merge sharded results into one final report
    #[command(name = "merge-report")]
    MergeReport(MergeArgs),

    /// Show the recorded history of one test
    History(HistoryArgs),

    /// Show run trends, flaky tests and slow tests from the history database
    Trends(TrendsArgs),
}
