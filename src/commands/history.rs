//! `ortoni history` and `ortoni trends` - read back the history database

use std::path::Path;

use serde_json::json;

use crate::cli::{Cli, HistoryArgs, OutputFormat, TrendsArgs};
use ortoni_core::config::HISTORY_DB_FILENAME;
use ortoni_core::error::{OrtoniError, Result};
use ortoni_core::history::{HistoryStore, DEFAULT_FLAKY_LIMIT, DEFAULT_SLOW_LIMIT};

fn open_store(dir: &Path) -> Result<HistoryStore> {
    if !dir.is_dir() {
        return Err(OrtoniError::FolderNotFound {
            path: dir.to_path_buf(),
        });
    }
    let path = dir.join(HISTORY_DB_FILENAME);
    if !path.is_file() {
        return Ok(HistoryStore::disabled(&format!(
            "no history database at {}",
            path.display()
        )));
    }
    Ok(HistoryStore::initialize(&path))
}

/// Execute the history command
pub fn execute_history(cli: &Cli, args: &HistoryArgs) -> Result<()> {
    let mut store = open_store(&args.dir)?;
    let entries = store.get_history(&args.test_id, args.limit);
    let note = store.note().map(str::to_string);
    store.close();

    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "testId": args.test_id,
                "history": entries,
                "historyNote": note,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if let Some(note) = &note {
                eprintln!("Note: {}", note);
            }
            if entries.is_empty() {
                if !cli.quiet {
                    println!("No history recorded for {}", args.test_id);
                }
                return Ok(());
            }
            for entry in &entries {
                let error = entry.error_message.lines().next().unwrap_or_default();
                if error.is_empty() {
                    println!("{}  {:<8} {}ms", entry.run_date, entry.status, entry.duration);
                } else {
                    println!(
                        "{}  {:<8} {}ms  {}",
                        entry.run_date, entry.status, entry.duration, error
                    );
                }
            }
        }
    }
    Ok(())
}

/// Execute the trends command
pub fn execute_trends(cli: &Cli, args: &TrendsArgs) -> Result<()> {
    let mut store = open_store(&args.dir)?;
    let summary = store.get_summary_data();
    let trends = store.get_trends(args.limit);
    let flaky = store.get_flaky_tests(DEFAULT_FLAKY_LIMIT);
    let slow = store.get_slow_tests(DEFAULT_SLOW_LIMIT);
    let note = store.note().map(str::to_string);
    store.close();

    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "summary": summary,
                "trends": trends,
                "flakyTests": flaky,
                "slowTests": slow,
                "historyNote": note,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if let Some(note) = &note {
                eprintln!("Note: {}", note);
            }
            println!(
                "{} runs, {} results, {}% passed, {}ms average",
                summary.total_runs, summary.total_tests, summary.pass_rate, summary.avg_duration
            );
            if cli.quiet {
                return Ok(());
            }

            if !trends.is_empty() {
                println!();
                println!("Recent runs:");
                for point in &trends {
                    println!(
                        "  {}  {} passed, {} failed, {}ms average",
                        point.run_date, point.passed, point.failed, point.avg_duration
                    );
                }
            }
            if !flaky.is_empty() {
                println!();
                println!("Flaky tests:");
                for test in &flaky {
                    println!(
                        "  {} ({} failures in {} runs)",
                        test.test_id, test.failures, test.total_runs
                    );
                }
            }
            if !slow.is_empty() {
                println!();
                println!("Slowest tests:");
                for test in &slow {
                    println!("  {} ({}ms over {} runs)", test.test_id, test.avg_duration, test.runs);
                }
            }
        }
    }
    Ok(())
}
