//! `ortoni report` - replay a host event stream through the reporter
//!
//! Events are JSON Lines, one `HostEvent` per line. Malformed lines, invalid
//! UTF-8 included, are skipped with a warning; replay stops at the first
//! `end` event.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::cli::{Cli, OutputFormat, ReportArgs};
use ortoni_core::config::ReporterConfig;
use ortoni_core::error::{OrtoniError, Result};
use ortoni_core::model::{HostEvent, RunStatus};
use ortoni_core::reporter::{Reporter, RunOutcome, RunOutput};

/// Execute the report command
pub fn execute(cli: &Cli, args: &ReportArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ReporterConfig::load(path)?,
        None => ReporterConfig::default(),
    };
    if let Some(folder) = &args.folder {
        config.folder_path = folder.to_string_lossy().into_owned();
    }

    let outcome = if args.events == Path::new("-") {
        replay(io::stdin().lock(), config)?
    } else {
        let file = File::open(&args.events)
            .map_err(|e| OrtoniError::io_operation("open events", args.events.display(), e))?;
        replay(BufReader::new(file), config)?
    };

    print_outcome(cli, &outcome)
}

/// Feed every event to a fresh reporter and finish the run
pub fn replay<R: BufRead>(reader: R, config: ReporterConfig) -> Result<RunOutcome> {
    let mut reporter = Reporter::new(config);

    for (index, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping event line that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed event");
                continue;
            }
        };

        if let Some(outcome) = reporter.handle(event)? {
            return Ok(outcome);
        }
    }

    warn!("Event stream ended without an end event, finishing run as interrupted");
    reporter.on_end(RunStatus::Interrupted, 0)
}

fn print_outcome(cli: &Cli, outcome: &RunOutcome) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
        OutputFormat::Human => {
            if cli.quiet {
                return Ok(());
            }
            match &outcome.output {
                RunOutput::Report(path) => println!("Ortoni report generated at {}", path.display()),
                RunOutput::Shard(path) => println!("Shard results written to {}", path.display()),
            }
            let summary = &outcome.summary;
            println!(
                "{} tests: {} passed, {} failed, {} flaky, {} skipped ({}% success) in {}",
                summary.total,
                summary.passed,
                summary.failed,
                summary.flaky,
                summary.skipped,
                summary.success_rate,
                summary.total_duration
            );
            if let Some(note) = &outcome.history_note {
                println!("Note: {}", note);
            }
            if outcome.should_open {
                if let RunOutput::Report(path) = &outcome.output {
                    println!("Open the report: {}", path.display());
                }
            }
        }
    }
    Ok(())
}
