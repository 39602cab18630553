//! Command trait and context for dispatching commands

use std::time::Instant;

use crate::cli::Cli;
use ortoni_core::error::Result;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, start: Instant) -> Self {
        Self { cli, start }
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("ortoni {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Test-run result aggregation and report generation.");
        println!();
        println!("Run `ortoni --help` for usage information.");
        Ok(())
    }
}
