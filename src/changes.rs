//! Change classification and subject-line assembly.
//!
//! Partitions a revision's change records into the added / removed / modified
//! summary categories and computes the common-directory label used in the
//! subject line.

use crate::repos::{ChangeRecord, Operation};
use std::collections::BTreeSet;

/// Selector for the `Added:` summary list.
pub fn is_added(change: &ChangeRecord) -> bool {
    change.operation == Operation::Added
}

/// Selector for the `Removed:` summary list.
pub fn is_deleted(change: &ChangeRecord) -> bool {
    change.operation == Operation::Deleted
}

/// Selector for the `Modified:` summary list: everything with a live path
/// that is neither an addition nor a deletion, including pure property
/// changes.
pub fn is_modified(change: &ChangeRecord) -> bool {
    matches!(
        change.operation,
        Operation::Modified | Operation::PropertyOnly
    )
}

/// The set of directories touched by a change list: directory changes map to
/// themselves, file changes to their parent, root-level files to `""`.
pub fn changed_directories(changes: &[ChangeRecord]) -> BTreeSet<String> {
    let mut dirs = BTreeSet::new();
    for change in changes {
        if change.is_directory() {
            dirs.insert(change.path.clone());
        } else {
            match change.path.rfind('/') {
                Some(idx) => dirs.insert(change.path[..idx].to_string()),
                None => dirs.insert(String::new()),
            };
        }
    }
    dirs
}

/// Compress a directory set against its longest shared path-segment prefix.
///
/// Returns `(common_prefix, display_list)`. There is no compression when only
/// a single directory was touched or when the repository root was touched: in
/// those cases the prefix is empty and the list is verbatim. An entry equal
/// to the prefix is displayed as `.`.
pub fn compress_directories(dirs: &BTreeSet<String>) -> (String, Vec<String>) {
    if dirs.len() == 1 || dirs.contains("") {
        return (String::new(), dirs.iter().cloned().collect());
    }

    let mut iter = dirs.iter();
    let mut common: Vec<&str> = iter.next().map(|d| d.split('/').collect()).unwrap_or_default();
    for dir in iter {
        let parts: Vec<&str> = dir.split('/').collect();
        let shared = common
            .iter()
            .zip(&parts)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }

    let prefix = common.join("/");
    if prefix.is_empty() {
        return (prefix, dirs.iter().cloned().collect());
    }

    let list = dirs
        .iter()
        .map(|d| {
            if d == &prefix {
                ".".to_string()
            } else {
                d[prefix.len() + 1..].to_string()
            }
        })
        .collect();
    (prefix, list)
}

/// The base subject line for a commit notification.
pub fn commit_subject(rev: i64, changes: &[ChangeRecord]) -> String {
    let dirs = changed_directories(changes);
    let (prefix, mut list) = compress_directories(&dirs);
    list.sort();
    let joined = list.join(" ");
    if prefix.is_empty() {
        format!("r{} - {}", rev, joined)
    } else {
        format!("r{} - in {}: {}", rev, prefix, joined)
    }
}
