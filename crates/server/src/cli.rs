//! Command-line arguments.

use clap::{Parser, Subcommand};

/// Workflow scheduler for the case management app.
///
/// Runs the automated check rules on demand (HTTP or CLI), after tasks
/// complete, and on a daily maintenance schedule.
#[derive(Parser, Debug)]
#[command(name = "caseflow-server", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API and the maintenance schedule (default)
    Serve,
    /// Run a single rule once and print its result as JSON
    Run {
        /// Rule slug (`cache-cleanup`) or store key (`rule3`)
        rule: String,
    },
    /// Print the rule catalog as YAML
    Rules,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
