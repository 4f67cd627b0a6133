//! `svnlook`-backed repository accessor.
//!
//! Provides a safe wrapper around the `svnlook` command with captured output
//! and structured error handling, plus parsers for its `info` and
//! `changed --copy-info` formats.

use super::{ChangeRecord, NodeKind, Operation, Repository};
use crate::error::{MailerError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

/// Repository accessor reading revision data through `svnlook`.
pub struct SvnlookRepository {
    repos_dir: PathBuf,
    rev: i64,
    author: String,
    date: String,
    log_message: String,
    /// Binary-detection memo, scoped to this accessor (one invocation).
    binary_cache: RefCell<HashMap<(String, i64), bool>>,
}

impl SvnlookRepository {
    /// Open a repository at `repos_dir` for revision `rev`.
    ///
    /// Reads the revision metadata eagerly so that a bad repository path or
    /// revision number fails before any delivery is attempted.
    pub fn open(repos_dir: &Path, rev: i64) -> Result<SvnlookRepository> {
        let repos_dir = repos_dir
            .canonicalize()
            .map_err(|e| MailerError::Repository(format!("{}: {}", repos_dir.display(), e)))?;
        let info = run_svnlook(&repos_dir, "info", &["-r", &rev.to_string()])?;
        let info = String::from_utf8_lossy(&info).into_owned();
        let (author, date, log_message) = parse_info(&info)?;
        Ok(SvnlookRepository {
            repos_dir,
            rev,
            author,
            date,
            log_message,
            binary_cache: RefCell::new(HashMap::new()),
        })
    }

    fn rev_arg(rev: i64) -> String {
        rev.to_string()
    }
}

impl Repository for SvnlookRepository {
    fn root_path(&self) -> &Path {
        &self.repos_dir
    }

    fn rev(&self) -> i64 {
        self.rev
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn log_message(&self) -> &str {
        &self.log_message
    }

    fn changes(&self) -> Result<Vec<ChangeRecord>> {
        let output = run_svnlook(
            &self.repos_dir,
            "changed",
            &["--copy-info", "-r", &Self::rev_arg(self.rev)],
        )?;
        let mut records = parse_changed(&String::from_utf8_lossy(&output))?;

        // svnlook does not report whether a copied file also changed its
        // text, so compare both sides. Copies with identical content are
        // reported in the summary only, never as a diff.
        for record in &mut records {
            if record.kind == NodeKind::File && record.is_copy() {
                let source = self.export_file(
                    record.copy_from_path.as_deref().unwrap_or_default(),
                    record.copy_from_rev.unwrap_or(self.rev - 1),
                )?;
                let copy = self.export_file(&record.path, self.rev)?;
                record.text_changed =
                    std::fs::read(source.path())? != std::fs::read(copy.path())?;
            }
        }
        Ok(records)
    }

    fn rev_prop(&self, name: &str) -> Result<Option<String>> {
        let output = run_svnlook_optional(
            &self.repos_dir,
            "propget",
            &["--revprop", "-r", &Self::rev_arg(self.rev), name],
        )?;
        Ok(output.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn export_file(&self, path: &str, rev: i64) -> Result<NamedTempFile> {
        let output = run_svnlook(&self.repos_dir, "cat", &["-r", &Self::rev_arg(rev), path])?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&output)?;
        file.flush()?;
        Ok(file)
    }

    fn is_binary(&self, path: &str, rev: i64) -> Result<bool> {
        let key = (path.to_string(), rev);
        if let Some(&cached) = self.binary_cache.borrow().get(&key) {
            return Ok(cached);
        }
        let output = run_svnlook_optional(
            &self.repos_dir,
            "propget",
            &["-r", &Self::rev_arg(rev), "svn:mime-type", path],
        )?;
        // Unset mime-type means text; anything outside text/* is binary.
        let binary = match output {
            Some(bytes) => {
                let mime = String::from_utf8_lossy(&bytes);
                !mime.trim().starts_with("text/")
            }
            None => false,
        };
        self.binary_cache.borrow_mut().insert(key, binary);
        Ok(binary)
    }
}

/// Run an svnlook subcommand against `repos`, returning raw stdout.
fn run_svnlook(repos: &Path, subcommand: &str, args: &[&str]) -> Result<Vec<u8>> {
    match run(repos, subcommand, args)? {
        (true, stdout, _) => Ok(stdout),
        (false, _, stderr) => Err(MailerError::Repository(format!(
            "svnlook {} failed: {}",
            subcommand,
            String::from_utf8_lossy(&stderr).trim()
        ))),
    }
}

/// Like [`run_svnlook`] but a nonzero exit means "not present" (`propget` on
/// an unset property), not an error.
fn run_svnlook_optional(
    repos: &Path,
    subcommand: &str,
    args: &[&str],
) -> Result<Option<Vec<u8>>> {
    match run(repos, subcommand, args)? {
        (true, stdout, _) => Ok(Some(stdout)),
        (false, _, _) => Ok(None),
    }
}

fn run(repos: &Path, subcommand: &str, args: &[&str]) -> Result<(bool, Vec<u8>, Vec<u8>)> {
    // The repository path is svnlook's first positional argument; further
    // positionals (property name, path) follow in `args`.
    let output = Command::new("svnlook")
        .arg(subcommand)
        .arg(repos)
        .args(args)
        .output()
        .map_err(|e| MailerError::Repository(format!("failed to execute svnlook: {}", e)))?;
    Ok((output.status.success(), output.stdout, output.stderr))
}

/// Parse `svnlook info` output: author, date, log size, log message.
fn parse_info(output: &str) -> Result<(String, String, String)> {
    let mut lines = output.splitn(4, '\n');
    let author = lines.next().unwrap_or_default().to_string();
    let date = lines
        .next()
        .ok_or_else(|| MailerError::Repository("truncated svnlook info output".to_string()))?
        .to_string();
    let _log_size = lines
        .next()
        .ok_or_else(|| MailerError::Repository("truncated svnlook info output".to_string()))?;
    let log = lines
        .next()
        .unwrap_or_default()
        .trim_end_matches('\n')
        .to_string();
    Ok((author, date, log))
}

/// Parse `svnlook changed --copy-info` output into change records.
///
/// Lines carry a four-character flag prefix (text status, property status,
/// copy marker, separator) followed by the path; directories end with `/`.
/// Copied additions are followed by an indented `(from <path>:r<rev>)` line.
fn parse_changed(output: &str) -> Result<Vec<ChangeRecord>> {
    let mut records: Vec<ChangeRecord> = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(copy_info) = line.strip_prefix("    (from ") {
            let copy_info = copy_info.strip_suffix(')').ok_or_else(|| {
                MailerError::Repository(format!("unrecognized copy-info line: {line:?}"))
            })?;
            let (path, rev) = copy_info.rsplit_once(":r").ok_or_else(|| {
                MailerError::Repository(format!("unrecognized copy-info line: {line:?}"))
            })?;
            let rev = rev.parse::<i64>().map_err(|_| {
                MailerError::Repository(format!("bad copy revision in line: {line:?}"))
            })?;
            let record = records.last_mut().ok_or_else(|| {
                MailerError::Repository(format!("dangling copy-info line: {line:?}"))
            })?;
            record.copy_from_path = Some(path.trim_end_matches('/').to_string());
            record.copy_from_rev = Some(rev);
            continue;
        }

        let flags = line.as_bytes();
        if flags.len() < 5 {
            return Err(MailerError::Repository(format!(
                "unrecognized change line: {line:?}"
            )));
        }
        let (text_flag, prop_flag) = (flags[0] as char, flags[1] as char);
        let path = &line[4..];
        let kind = if path.ends_with('/') {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let path = path.trim_end_matches('/').to_string();

        let (operation, text_changed, props_changed) = match (text_flag, prop_flag) {
            ('A', p) => (Operation::Added, true, p == 'U'),
            ('D', p) => (Operation::Deleted, false, p == 'U'),
            ('U', 'U') => (Operation::Modified, true, true),
            ('U', _) => (Operation::Modified, true, false),
            ('_', 'U') => (Operation::PropertyOnly, false, true),
            _ => {
                return Err(MailerError::Repository(format!(
                    "unrecognized change line: {line:?}"
                )));
            }
        };

        records.push(ChangeRecord {
            path,
            kind,
            operation,
            text_changed,
            props_changed,
            copy_from_path: None,
            copy_from_rev: None,
        });
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}
