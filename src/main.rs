//! Revmail: commit notification mailer for Subversion repositories.
//!
//! This is the main entry point for the `revmail` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod changes;
mod cli;
mod commands;
pub mod config;
mod content;
mod delivery;
mod diff;
mod dispatcher;
pub mod error;
pub mod exit_codes;
mod params;
mod repos;
mod rules;
#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
