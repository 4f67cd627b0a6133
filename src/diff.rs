//! Per-change diff rendering.
//!
//! Decides for each change whether a diff body appears, emits the section
//! header and separator, short-circuits binary content, and otherwise
//! materializes both sides into temp files and streams the external diff
//! command's output into the delivery backend.

use crate::config::{Config, DiffPolicy};
use crate::delivery::DeliveryBackend;
use crate::error::Result;
use crate::params::params;
use crate::repos::{ChangeRecord, Operation, Repository};
use tempfile::NamedTempFile;

const SEPARATOR_WIDTH: usize = 78;

/// One side of a diff: a path at a revision, or an empty file.
type Side = Option<(String, i64)>;

struct DiffPlan {
    header: String,
    label_from: String,
    label_to: String,
    from: Side,
    to: Side,
    /// Chooses between the singular and plural binary notes.
    singular: bool,
}

/// Render the diff section for one change, or nothing when the policy or the
/// change kind suppresses it. Directory changes never get a diff; their whole
/// story is in the summary lists.
pub fn generate_diff(
    out: &mut dyn DeliveryBackend,
    cfg: &Config,
    repos: &dyn Repository,
    date: &str,
    change: &ChangeRecord,
    policy: DiffPolicy,
) -> Result<()> {
    if change.is_directory() {
        return Ok(());
    }

    let rev = repos.rev();
    let base_rev = rev - 1;

    let plan = match change.operation {
        Operation::Deleted => {
            if !policy.delete {
                return Ok(());
            }
            DiffPlan {
                header: format!("\nDeleted: {}\n", change.path),
                label_from: format!("{}\t{}", change.path, date),
                label_to: "(empty file)".to_string(),
                from: Some((change.path.clone(), base_rev)),
                to: None,
                singular: true,
            }
        }
        Operation::Added => match (&change.copy_from_path, change.copy_from_rev) {
            (Some(src), Some(src_rev)) => {
                // Unchanged copies are fully described by the summary line.
                if !change.text_changed || !policy.copy {
                    return Ok(());
                }
                DiffPlan {
                    header: format!("\nCopied: {} (from r{}, {})\n", change.path, src_rev, src),
                    label_from: format!("{}\t(original)", src),
                    label_to: format!("{}\t{}", change.path, date),
                    from: Some((src.clone(), src_rev)),
                    to: Some((change.path.clone(), rev)),
                    singular: false,
                }
            }
            _ => {
                if !policy.add {
                    return Ok(());
                }
                DiffPlan {
                    header: format!("\nAdded: {}\n", change.path),
                    label_from: "(empty file)".to_string(),
                    label_to: format!("{}\t{}", change.path, date),
                    from: None,
                    to: Some((change.path.clone(), rev)),
                    singular: true,
                }
            }
        },
        Operation::Modified => {
            if !change.text_changed || !policy.modify {
                return Ok(());
            }
            DiffPlan {
                header: format!("\nModified: {}\n", change.path),
                label_from: format!("{}\t(original)", change.path),
                label_to: format!("{}\t{}", change.path, date),
                from: Some((change.path.clone(), base_rev)),
                to: Some((change.path.clone(), rev)),
                singular: false,
            }
        }
        Operation::PropertyOnly => return Ok(()),
    };

    out.write(plan.header.as_bytes())?;
    out.write(format!("{}\n", "=".repeat(SEPARATOR_WIDTH)).as_bytes())?;

    if side_is_binary(repos, &plan.from)? || side_is_binary(repos, &plan.to)? {
        let note = if plan.singular {
            "Binary file. No diff available.\n"
        } else {
            "Binary files. No diff available.\n"
        };
        out.write(note.as_bytes())?;
        return Ok(());
    }

    // The handles keep both temp files alive until the diff command exits.
    let from_file = materialize(repos, &plan.from)?;
    let to_file = materialize(repos, &plan.to)?;

    let from_path = from_file.path().to_string_lossy().into_owned();
    let to_path = to_file.path().to_string_lossy().into_owned();
    let argv = cfg.diff_command(&params([
        ("label_from", plan.label_from.as_str()),
        ("label_to", plan.label_to.as_str()),
        ("from", from_path.as_str()),
        ("to", to_path.as_str()),
    ]))?;
    out.run(&argv)
}

fn side_is_binary(repos: &dyn Repository, side: &Side) -> Result<bool> {
    match side {
        Some((path, rev)) => repos.is_binary(path, *rev),
        None => Ok(false),
    }
}

fn materialize(repos: &dyn Repository, side: &Side) -> Result<NamedTempFile> {
    match side {
        Some((path, rev)) => repos.export_file(path, *rev),
        None => Ok(NamedTempFile::new()?),
    }
}
