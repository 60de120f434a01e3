//! CLI module for Winserve.
//!
//! `winserve serve` runs the window server on a headless device; the other
//! commands inspect it or manage its configuration.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::CliError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    cli.execute()
}
