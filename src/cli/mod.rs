//! CLI argument parsing for revmail.
//!
//! Uses clap derive macros for declarative argument definitions. This module
//! defines the command structure; the implementations live in the `commands`
//! module. The positional argument order matches what Subversion hook scripts
//! pass, so a hook line stays a one-liner.

use crate::exit_codes;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Revmail: commit notification mailer for Subversion repositories.
///
/// Intended to run from repository hooks: `commit` from post-commit and
/// `propchange` from post-revprop-change. Routing, recipients, and diff
/// rendering are driven by an INI configuration file.
#[derive(Parser, Debug)]
#[command(name = "revmail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for revmail.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send notification mail for a committed revision.
    Commit(CommitArgs),

    /// Send notification mail for a revision property change.
    Propchange(PropchangeArgs),
}

/// Arguments for the `commit` command.
#[derive(Parser, Debug)]
pub struct CommitArgs {
    /// Path of the repository on disk.
    pub repos_dir: PathBuf,

    /// The committed revision number.
    pub revision: i64,

    /// Configuration file. Defaults to conf/mailer.conf inside the
    /// repository, then mailer.conf next to the executable.
    pub config_file: Option<PathBuf>,
}

/// Arguments for the `propchange` command.
#[derive(Parser, Debug)]
pub struct PropchangeArgs {
    /// Path of the repository on disk.
    pub repos_dir: PathBuf,

    /// The revision whose property changed.
    pub revision: i64,

    /// The user who changed the property.
    pub author: String,

    /// The name of the changed revision property.
    pub propname: String,

    /// Configuration file. Defaults to conf/mailer.conf inside the
    /// repository, then mailer.conf next to the executable.
    pub config_file: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    ///
    /// Usage failures exit with [`exit_codes::USER_ERROR`] rather than clap's
    /// default of 2, which is reserved for configuration errors. `--help` and
    /// `--version` remain successful exits.
    pub fn parse_args() -> Self {
        match Cli::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let code = parse_error_exit_code(&err);
                let _ = err.print();
                std::process::exit(code);
            }
        }
    }
}

fn parse_error_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::SUCCESS,
        _ => exit_codes::USER_ERROR,
    }
}
