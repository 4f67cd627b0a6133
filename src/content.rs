//! Commit notification body generation.
//!
//! Renders the plain-text body for one commit: the metadata block, the
//! Added / Removed / Modified summary lists, the log message, and then one
//! diff section per eligible change.

use crate::changes::{is_added, is_deleted, is_modified};
use crate::config::Config;
use crate::delivery::DeliveryBackend;
use crate::diff;
use crate::error::Result;
use crate::repos::{ChangeRecord, Repository, Revision};
use chrono::DateTime;

/// Write the full commit body for one group into an already-started backend.
pub fn generate_commit_content(
    out: &mut dyn DeliveryBackend,
    cfg: &Config,
    repos: &dyn Repository,
    revision: &Revision,
    group: Option<&str>,
) -> Result<()> {
    let date = human_date(&revision.date);
    out.write(
        format!(
            "Author: {}\nDate: {}\nNew Revision: {}\n\n",
            revision.author, date, revision.number
        )
        .as_bytes(),
    )?;

    write_list(out, "Added", &revision.changes, is_added)?;
    write_list(out, "Removed", &revision.changes, is_deleted)?;
    write_list(out, "Modified", &revision.changes, is_modified)?;

    out.write(format!("Log:\n{}\n", revision.log_message).as_bytes())?;

    let policy = cfg.diff_policy(group);
    for change in &revision.changes {
        diff::generate_diff(out, cfg, repos, &date, change, policy)?;
    }
    Ok(())
}

/// Render a summary category. Nothing is written for an empty category.
fn write_list(
    out: &mut dyn DeliveryBackend,
    header: &str,
    changes: &[ChangeRecord],
    select: fn(&ChangeRecord) -> bool,
) -> Result<()> {
    let selected: Vec<&ChangeRecord> = changes.iter().filter(|c| select(c)).collect();
    if selected.is_empty() {
        return Ok(());
    }

    let mut text = format!("{}:\n", header);
    for change in selected {
        let slash = if change.is_directory() { "/" } else { "" };
        let props = if change.props_changed {
            if change.text_changed {
                "   (contents, props changed)"
            } else {
                "   (props changed)"
            }
        } else {
            ""
        };
        text.push_str(&format!("   {}{}{}\n", change.path, slash, props));

        // Only additions announce their copy source.
        if change.is_copy() {
            if let (Some(src), Some(src_rev)) = (&change.copy_from_path, change.copy_from_rev) {
                let detail = if change.is_directory() {
                    ""
                } else if change.text_changed {
                    ", changed"
                } else {
                    " unchanged"
                };
                text.push_str(&format!(
                    "      - copied{} from r{}, {}{}\n",
                    detail, src_rev, src, slash
                ));
            }
        }
    }
    out.write(text.as_bytes())
}

/// Format a repository timestamp in ctime style, e.g.
/// `Mon Mar 14 10:24:10 2011`. Unrecognized input is passed through verbatim.
pub fn human_date(raw: &str) -> String {
    // svnlook prints "2011-03-14 10:24:10 -0500 (Mon, 14 Mar 2011)".
    let prefix = raw.get(..25).unwrap_or(raw);
    if let Ok(dt) = DateTime::parse_from_str(prefix, "%Y-%m-%d %H:%M:%S %z") {
        return dt.format("%a %b %e %H:%M:%S %Y").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%a %b %e %H:%M:%S %Y").to_string();
    }
    raw.to_string()
}
