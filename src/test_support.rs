//! Shared fixtures for unit tests.

use crate::delivery::{DeliveryBackend, DeliveryTarget};
use crate::error::Result;
use crate::repos::{ChangeRecord, Repository};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// In-memory [`Repository`] with builder-style setup.
pub struct FixtureRepository {
    root: PathBuf,
    rev: i64,
    author: String,
    date: String,
    log_message: String,
    changes: Vec<ChangeRecord>,
    files: HashMap<(String, i64), Vec<u8>>,
    binary: HashSet<(String, i64)>,
    rev_props: HashMap<String, String>,
}

impl FixtureRepository {
    pub fn new(rev: i64) -> FixtureRepository {
        FixtureRepository {
            root: PathBuf::from("/srv/svn/deli"),
            rev,
            author: "alice".to_string(),
            date: "2011-03-14 10:24:10 -0500 (Mon, 14 Mar 2011)".to_string(),
            log_message: "tighten the pickle routing\n".to_string(),
            changes: Vec::new(),
            files: HashMap::new(),
            binary: HashSet::new(),
            rev_props: HashMap::new(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<ChangeRecord>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_file(mut self, path: &str, rev: i64, content: &[u8]) -> Self {
        self.files.insert((path.to_string(), rev), content.to_vec());
        self
    }

    pub fn with_binary(mut self, path: &str, rev: i64) -> Self {
        self.binary.insert((path.to_string(), rev));
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_log(mut self, log_message: &str) -> Self {
        self.log_message = log_message.to_string();
        self
    }

    pub fn with_rev_prop(mut self, name: &str, value: &str) -> Self {
        self.rev_props.insert(name.to_string(), value.to_string());
        self
    }
}

impl Repository for FixtureRepository {
    fn root_path(&self) -> &Path {
        &self.root
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
        Ok(self.changes.clone())
    }

    fn rev_prop(&self, name: &str) -> Result<Option<String>> {
        Ok(self.rev_props.get(name).cloned())
    }

    fn export_file(&self, path: &str, rev: i64) -> Result<NamedTempFile> {
        // Unknown paths export as empty files, like a missing diff side.
        let mut file = NamedTempFile::new()?;
        if let Some(content) = self.files.get(&(path.to_string(), rev)) {
            file.write_all(content)?;
            file.flush()?;
        }
        Ok(file)
    }

    fn is_binary(&self, path: &str, rev: i64) -> Result<bool> {
        Ok(self.binary.contains(&(path.to_string(), rev)))
    }
}

/// Delivery backend that records everything and spawns nothing.
pub struct CaptureBackend {
    targets: Vec<DeliveryTarget>,
    bytes: Vec<u8>,
    /// Byte offsets where each started message begins.
    starts: Vec<usize>,
    commands: Vec<Vec<String>>,
    finished: usize,
}

impl CaptureBackend {
    pub fn new() -> CaptureBackend {
        CaptureBackend {
            targets: Vec::new(),
            bytes: Vec::new(),
            starts: Vec::new(),
            commands: Vec::new(),
            finished: 0,
        }
    }

    /// Everything written so far, across all messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// The body of each started message, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (i, &start) in self.starts.iter().enumerate() {
            let end = self.starts.get(i + 1).copied().unwrap_or(self.bytes.len());
            out.push(String::from_utf8_lossy(&self.bytes[start..end]).into_owned());
        }
        out
    }

    pub fn targets(&self) -> &[DeliveryTarget] {
        &self.targets
    }

    /// The argv of every `run` invocation, in order.
    pub fn commands(&self) -> &[Vec<String>] {
        &self.commands
    }

    pub fn finished(&self) -> usize {
        self.finished
    }
}

impl DeliveryBackend for CaptureBackend {
    fn start(&mut self, target: &DeliveryTarget) -> Result<()> {
        self.targets.push(target.clone());
        self.starts.push(self.bytes.len());
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished += 1;
        Ok(())
    }

    fn run(&mut self, argv: &[String]) -> Result<()> {
        self.commands.push(argv.to_vec());
        Ok(())
    }
}
