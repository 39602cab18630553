//! `ortoni merge-report` - combine shard files into the final report

use tracing::debug;

use crate::cli::{Cli, MergeArgs, OutputFormat};
use ortoni_core::config::{MergeMode, ReporterConfig};
use ortoni_core::error::Result;
use ortoni_core::pipeline::{merge_report, MergeOptions, MergeOutcome};

/// Execute the merge-report command
pub fn execute(cli: &Cli, args: &MergeArgs) -> Result<()> {
    let options = MergeOptions {
        dir: args.dir.clone(),
        file: args.file.clone(),
        save_history: args.save_history_override(),
        mode: merge_mode(args)?,
    };
    debug!(mode = ?options.mode, save_history = ?options.save_history, "merge options");

    let outcome = merge_report(&options)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Human => print_human(cli, &outcome),
    }
    Ok(())
}

/// `--dedupe` wins over the configured mode
fn merge_mode(args: &MergeArgs) -> Result<MergeMode> {
    if args.dedupe {
        return Ok(MergeMode::Dedupe);
    }
    match &args.config {
        Some(path) => Ok(ReporterConfig::load(path)?.merge_mode),
        None => Ok(MergeMode::default()),
    }
}

fn print_human(cli: &Cli, outcome: &MergeOutcome) {
    if cli.quiet {
        println!("{}", outcome.report.report_path.display());
        return;
    }

    println!("Merging {} shard files", outcome.shards.len());
    for shard in &outcome.shards {
        println!("  {}: {} tests", shard.name, shard.results);
    }
    for skipped in &outcome.skipped_shards {
        println!("  {}: skipped", skipped);
    }
    if outcome.duplicates_dropped > 0 {
        println!("Dropped {} duplicate results", outcome.duplicates_dropped);
    }
    println!("Total tests: {}", outcome.total_results);
    println!("Success rate: {}%", outcome.report.summary.success_rate);
    if let Some(note) = &outcome.report.history_note {
        println!("Note: {}", note);
    }
    println!(
        "Final merged report generated at {}",
        outcome.report.report_path.display()
    );
}
