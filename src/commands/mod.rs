//! Command implementations for revmail.
//!
//! Each command follows the same shape: open the repository accessor, load
//! and validate the configuration, compile the routing rules, pick the
//! delivery backend, then hand off to the dispatcher.

use crate::cli::{Command, CommitArgs, PropchangeArgs};
use crate::config::Config;
use crate::delivery::select_backend;
use crate::dispatcher;
use crate::error::{MailerError, Result};
use crate::params::params;
use crate::repos::{Repository, SvnlookRepository};
use crate::rules::RuleSet;
use std::path::{Path, PathBuf};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Commit(args) => cmd_commit(args),
        Command::Propchange(args) => cmd_propchange(args),
    }
}

fn cmd_commit(args: CommitArgs) -> Result<()> {
    let repos = SvnlookRepository::open(&args.repos_dir, args.revision)?;
    let config_path = resolve_config_path(args.config_file, repos.root_path())?;
    let cfg = Config::load(&config_path)?;
    let global = params([("author", repos.author())]);
    let rules = RuleSet::compile(&cfg, repos.root_path(), &global)?;
    let mut backend = select_backend(&cfg.general)?;
    dispatcher::deliver_commit(&cfg, &rules, &repos, backend.as_mut())
}

fn cmd_propchange(args: PropchangeArgs) -> Result<()> {
    let repos = SvnlookRepository::open(&args.repos_dir, args.revision)?;
    let config_path = resolve_config_path(args.config_file, repos.root_path())?;
    let cfg = Config::load(&config_path)?;
    let global = params([("author", args.author.as_str())]);
    let rules = RuleSet::compile(&cfg, repos.root_path(), &global)?;
    let mut backend = select_backend(&cfg.general)?;
    dispatcher::deliver_propchange(
        &cfg,
        &rules,
        &repos,
        &args.author,
        &args.propname,
        backend.as_mut(),
    )
}

/// An explicit path wins. Otherwise look for conf/mailer.conf inside the
/// repository, then fall back to mailer.conf next to the running executable.
fn resolve_config_path(explicit: Option<PathBuf>, repos_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let in_repos = repos_dir.join("conf").join("mailer.conf");
    if in_repos.is_file() {
        return Ok(in_repos);
    }
    let exe = std::env::current_exe()
        .map_err(|e| MailerError::Config(format!("cannot locate executable: {}", e)))?;
    Ok(exe.with_file_name("mailer.conf"))
}
