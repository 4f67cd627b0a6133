//! Repository access for revmail.
//!
//! Defines the change-record data model and the [`Repository`] trait the
//! content pipeline is written against, plus the `svnlook`-backed
//! implementation used by the CLI. The trait keeps the engine decoupled from
//! the repository store: tests drive it with an in-memory fixture.

mod svnlook;

pub use svnlook::SvnlookRepository;

use crate::error::Result;
use std::path::Path;
use tempfile::NamedTempFile;

/// Node kind of a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// How a path changed in a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Added,
    Deleted,
    Modified,
    /// Properties changed with no text change.
    PropertyOnly,
}

/// One changed path in a revision.
///
/// Created once from the repository's change-collection pass and immutable
/// thereafter. Deleted records keep their path for the summary; content for
/// their diff is retrieved from the previous revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: String,
    pub kind: NodeKind,
    pub operation: Operation,
    pub text_changed: bool,
    pub props_changed: bool,
    /// Copy source, for paths added via copy.
    pub copy_from_path: Option<String>,
    pub copy_from_rev: Option<i64>,
}

impl ChangeRecord {
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Whether this record is an addition via copy.
    pub fn is_copy(&self) -> bool {
        self.operation == Operation::Added && self.copy_from_path.is_some()
    }
}

/// Metadata and changes of one revision.
///
/// Owned by the dispatcher for the lifetime of one notification run and never
/// mutated.
#[derive(Debug, Clone)]
pub struct Revision {
    pub number: i64,
    pub author: String,
    pub log_message: String,
    /// Commit date as reported by the repository (opaque string).
    pub date: String,
    /// Per-path changes, ordered by path.
    pub changes: Vec<ChangeRecord>,
}

/// Read-only access to one revision of a repository.
///
/// All accessors are safe to call repeatedly within a run; implementations
/// memoize what they need with caches scoped to their own lifetime.
pub trait Repository {
    /// Canonical path of the repository on disk.
    fn root_path(&self) -> &Path;

    /// The revision this accessor was opened for.
    fn rev(&self) -> i64;

    fn author(&self) -> &str;

    /// Commit date as an opaque timestamp string.
    fn date(&self) -> &str;

    fn log_message(&self) -> &str;

    /// The per-path changes of this revision, sorted by path.
    fn changes(&self) -> Result<Vec<ChangeRecord>>;

    /// Look up an arbitrary revision property (e.g. for propchange
    /// notifications). `None` when unset.
    fn rev_prop(&self, name: &str) -> Result<Option<String>>;

    /// Materialize the content of `path` at `rev` into a temp file for the
    /// external diff command. The returned handle keeps the file alive.
    fn export_file(&self, path: &str, rev: i64) -> Result<NamedTempFile>;

    /// Whether `path` at `rev` holds binary content.
    fn is_binary(&self, path: &str, rev: i64) -> Result<bool>;
}
