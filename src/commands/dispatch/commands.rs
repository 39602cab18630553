//! Command implementations for all ortoni commands

use tracing::debug;

use crate::cli::Commands;
use crate::commands::dispatch::command::{Command, CommandContext};
use crate::commands::{history, merge, report};
use ortoni_core::error::Result;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let (name, result) = match self {
            Commands::Report(args) => ("report", report::execute(ctx.cli, args)),
            Commands::MergeReport(args) => ("merge-report", merge::execute(ctx.cli, args)),
            Commands::History(args) => ("history", history::execute_history(ctx.cli, args)),
            Commands::Trends(args) => ("trends", history::execute_trends(ctx.cli, args)),
        };
        debug!(command = name, elapsed = ?ctx.start.elapsed(), "execute_command");
        result
    }
}
