//! Notification dispatch.
//!
//! Determines the distinct (group, parameters) audiences of an event, resolves
//! each one's delivery target from the configuration, and drives one message
//! per audience through the backend. Delivery is fail-fast: the first failing
//! message aborts the run.

use crate::changes::commit_subject;
use crate::config::Config;
use crate::content::generate_commit_content;
use crate::delivery::{DeliveryBackend, DeliveryTarget};
use crate::error::Result;
use crate::params::ParameterSet;
use crate::repos::{Repository, Revision};
use crate::rules::RuleSet;
use std::collections::BTreeMap;

/// Sender of record when the repository has no author and no `from_addr` is
/// configured.
const NO_AUTHOR: &str = "no_author";

/// Send one commit notification per distinct audience of the revision.
///
/// A revision with no changed paths notifies nobody.
pub fn deliver_commit(
    cfg: &Config,
    rules: &RuleSet,
    repos: &dyn Repository,
    out: &mut dyn DeliveryBackend,
) -> Result<()> {
    let revision = Revision {
        number: repos.rev(),
        author: repos.author().to_string(),
        log_message: repos.log_message().to_string(),
        date: repos.date().to_string(),
        changes: repos.changes()?,
    };

    let subject = commit_subject(revision.number, &revision.changes);
    for (group, params) in audiences(rules, &revision) {
        let group = group.as_deref();
        let subject = prefixed_subject(cfg, group, &params, &subject, |o| {
            o.commit_subject_prefix.as_ref()
        })?;
        let target = resolve_target(cfg, group, &params, &revision.author, subject)?;
        out.start(&target)?;
        generate_commit_content(out, cfg, repos, &revision, group)?;
        out.finish()?;
    }
    Ok(())
}

/// Send one revision-property-change notification per matching group.
///
/// `author` comes from the hook invocation, not from the repository: the
/// property may well be the author record itself.
pub fn deliver_propchange(
    cfg: &Config,
    rules: &RuleSet,
    repos: &dyn Repository,
    author: &str,
    propname: &str,
    out: &mut dyn DeliveryBackend,
) -> Result<()> {
    let value = repos.rev_prop(propname)?.unwrap_or_default();
    let base_subject = format!("r{} - {}", repos.rev(), propname);

    for (group, params) in rules.matches("") {
        let subject = prefixed_subject(cfg, group, &params, &base_subject, |o| {
            o.propchange_subject_prefix.as_ref()
        })?;
        let target = resolve_target(cfg, group, &params, author, subject)?;
        out.start(&target)?;
        out.write(
            format!(
                "Author: {}\nRevision: {}\nProperty Name: {}\n\n",
                author,
                repos.rev(),
                propname
            )
            .as_bytes(),
        )?;
        out.write(b"New Property Value:\n")?;
        out.write(value.as_bytes())?;
        out.finish()?;
    }
    Ok(())
}

/// The distinct (group, parameters) pairs of a revision, in deterministic
/// order. Two paths landing in the same group with the same parameters
/// collapse into one audience; differing parameters (e.g. from path captures)
/// stay separate.
fn audiences(rules: &RuleSet, revision: &Revision) -> Vec<(Option<String>, ParameterSet)> {
    let mut seen: BTreeMap<(Option<String>, Vec<(String, String)>), ParameterSet> = BTreeMap::new();
    for change in &revision.changes {
        for (group, params) in rules.matches(&change.path) {
            let key = (
                group.map(str::to_string),
                params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
            seen.entry(key).or_insert(params);
        }
    }
    seen.into_iter()
        .map(|((group, _), params)| (group, params))
        .collect()
}

fn prefixed_subject<F>(
    cfg: &Config,
    group: Option<&str>,
    params: &ParameterSet,
    base: &str,
    pick: F,
) -> Result<String>
where
    F: for<'a> Fn(&'a crate::config::GroupOptions) -> Option<&'a String>,
{
    let prefix = cfg.resolved("subject_prefix", group, params, pick)?;
    if prefix.is_empty() {
        Ok(base.to_string())
    } else {
        Ok(format!("{} {}", prefix, base))
    }
}

fn resolve_target(
    cfg: &Config,
    group: Option<&str>,
    params: &ParameterSet,
    author: &str,
    subject: String,
) -> Result<DeliveryTarget> {
    let to_addr = cfg.resolved("to_addr", group, params, |o| o.to_addr.as_ref())?;
    let to = to_addr.split_whitespace().map(str::to_string).collect();

    let from_addr = cfg.resolved("from_addr", group, params, |o| o.from_addr.as_ref())?;
    let from = if !from_addr.is_empty() {
        from_addr
    } else if !author.is_empty() {
        author.to_string()
    } else {
        NO_AUTHOR.to_string()
    };

    let reply_to = cfg.resolved("reply_to", group, params, |o| o.reply_to.as_ref())?;
    let reply_to = (!reply_to.is_empty()).then_some(reply_to);

    Ok(DeliveryTarget {
        to,
        from,
        reply_to,
        subject,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::{ChangeRecord, NodeKind, Operation};
    use crate::test_support::{CaptureBackend, FixtureRepository};
    use std::path::Path;

    const CONF: &str = "\
[general]
diff = diff -u -L %(label_from)s -L %(label_to)s %(from)s %(to)s

[defaults]
commit_subject_prefix = [svn]
to_addr = everyone@example.com

[area-a]
for_paths = a/.*
to_addr = a-team@example.com
from_addr = commits@example.com
reply_to = a-list@example.com
";

    fn setup(conf: &str) -> (Config, RuleSet) {
        let cfg = Config::parse(conf).unwrap();
        let rules = RuleSet::compile(&cfg, Path::new("/srv/svn/deli"), &ParameterSet::new()).unwrap();
        (cfg, rules)
    }

    fn file(path: &str, operation: Operation) -> ChangeRecord {
        ChangeRecord {
            path: path.to_string(),
            kind: NodeKind::File,
            operation,
            text_changed: operation != Operation::Deleted,
            props_changed: false,
            copy_from_path: None,
            copy_from_rev: None,
        }
    }

    #[test]
    fn one_message_per_matching_group() {
        let repos = FixtureRepository::new(42)
            .with_changes(vec![
                file("a/new.txt", Operation::Added),
                file("b/other.txt", Operation::Modified),
            ])
            .with_file("a/new.txt", 42, b"fresh\n")
            .with_file("b/other.txt", 41, b"one\n")
            .with_file("b/other.txt", 42, b"two\n");
        let (cfg, rules) = setup(CONF);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();

        let targets = out.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(out.finished(), 2);

        // Deterministic order: the default audience sorts before named groups.
        assert_eq!(targets[0].to, vec!["everyone@example.com"]);
        // No from_addr in [defaults], so the author is the sender.
        assert_eq!(targets[0].from, "alice");
        assert_eq!(targets[1].to, vec!["a-team@example.com"]);
        assert_eq!(targets[1].from, "commits@example.com");
        assert_eq!(targets[1].reply_to.as_deref(), Some("a-list@example.com"));
    }

    #[test]
    fn subject_carries_prefix_and_directory_summary() {
        let repos = FixtureRepository::new(42)
            .with_changes(vec![
                file("a/b/one.txt", Operation::Modified),
                file("a/c/two.txt", Operation::Modified),
            ])
            .with_file("a/b/one.txt", 42, b"x\n")
            .with_file("a/c/two.txt", 42, b"y\n");
        let (cfg, rules) = setup(CONF);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();
        assert_eq!(out.targets()[0].subject, "[svn] r42 - in a: b c");
    }

    #[test]
    fn identical_audiences_collapse_to_one_message() {
        let repos = FixtureRepository::new(42).with_changes(vec![
            file("a/one.txt", Operation::Modified),
            file("a/two.txt", Operation::Modified),
        ]);
        let conf = "\
[general]
diff = diff %(from)s %(to)s

[area-a]
for_paths = a/.*
to_addr = a-team@example.com
";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();
        assert_eq!(out.targets().len(), 1);
    }

    #[test]
    fn path_captures_split_audiences() {
        let repos = FixtureRepository::new(42).with_changes(vec![
            file("a/one.txt", Operation::Modified),
            file("b/two.txt", Operation::Modified),
        ]);
        let conf = "\
[general]
diff = diff %(from)s %(to)s

[areas]
for_paths = (?P<area>[^/]+)/.*
to_addr = %(area)s-commits@example.com
";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();
        let mut to: Vec<_> = out.targets().iter().map(|t| t.to[0].clone()).collect();
        to.sort();
        assert_eq!(to, vec!["a-commits@example.com", "b-commits@example.com"]);
    }

    #[test]
    fn revision_without_changes_notifies_nobody() {
        let repos = FixtureRepository::new(42);
        let (cfg, rules) = setup(CONF);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();
        assert!(out.targets().is_empty());
    }

    #[test]
    fn missing_author_falls_back_to_placeholder_sender() {
        let repos = FixtureRepository::new(42)
            .with_author("")
            .with_changes(vec![file("b/x.txt", Operation::Modified)]);
        let conf = "[general]\ndiff = diff %(from)s %(to)s\n\n[defaults]\nfor_paths = .*\n";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();
        assert_eq!(out.targets()[0].from, "no_author");
    }

    #[test]
    fn suppressed_categories_stay_out_of_the_diff_sections() {
        let repos = FixtureRepository::new(42)
            .with_changes(vec![
                file("a/new.txt", Operation::Added),
                file("a/gone.txt", Operation::Deleted),
            ])
            .with_file("a/new.txt", 42, b"fresh\n")
            .with_file("a/gone.txt", 41, b"old\n");
        let conf = "\
[general]
diff = diff -u -L %(label_from)s -L %(label_to)s %(from)s %(to)s

[area-a]
for_paths = a/.*
to_addr = a-team@example.com
generate_diffs = add modify
";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();

        let body = out.text();
        // The deletion is summarized but gets no diff section.
        assert!(body.contains("Removed:\n   a/gone.txt\n"));
        assert!(!body.contains("\nDeleted: a/gone.txt\n"));
        assert!(body.contains("\nAdded: a/new.txt\n"));
        assert_eq!(out.commands().len(), 1);
    }

    #[test]
    fn end_to_end_commit_body_layout() {
        let repos = FixtureRepository::new(42)
            .with_log("rearrange the deli counter\n")
            .with_changes(vec![
                file("a/new.txt", Operation::Added),
                file("a/old.txt", Operation::Modified),
            ])
            .with_file("a/new.txt", 42, b"fresh\n")
            .with_file("a/old.txt", 41, b"one\n")
            .with_file("a/old.txt", 42, b"two\n");
        let (cfg, rules) = setup(CONF);
        let mut out = CaptureBackend::new();
        deliver_commit(&cfg, &rules, &repos, &mut out).unwrap();

        let body = &out.messages()[0];
        let metadata_at = body
            .find("Author: alice\nDate: Mon Mar 14 10:24:10 2011\nNew Revision: 42\n")
            .unwrap();
        let added_at = body.find("Added:\n   a/new.txt\n").unwrap();
        let modified_at = body.find("Modified:\n   a/old.txt\n").unwrap();
        let log_at = body.find("Log:\nrearrange the deli counter\n").unwrap();
        let diff_added_at = body.find("\nAdded: a/new.txt\n").unwrap();
        let diff_modified_at = body.find("\nModified: a/old.txt\n").unwrap();
        assert!(metadata_at < added_at);
        assert!(added_at < modified_at);
        assert!(modified_at < log_at);
        assert!(log_at < diff_added_at);
        assert!(diff_added_at < diff_modified_at);
        assert_eq!(out.commands().len(), 2);
    }

    #[test]
    fn propchange_notification_body_and_subject() {
        let repos = FixtureRepository::new(42).with_rev_prop("svn:log", "better wording\n");
        let conf = "\
[general]
diff = diff %(from)s %(to)s

[defaults]
for_paths = .*
propchange_subject_prefix = [svn propchange]
to_addr = admins@example.com
";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_propchange(&cfg, &rules, &repos, "bob", "svn:log", &mut out).unwrap();

        let targets = out.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].subject, "[svn propchange] r42 - svn:log");
        assert_eq!(targets[0].from, "bob");
        assert_eq!(targets[0].to, vec!["admins@example.com"]);
        assert_eq!(
            out.messages()[0],
            "Author: bob\nRevision: 42\nProperty Name: svn:log\n\n\
             New Property Value:\nbetter wording\n"
        );
    }

    #[test]
    fn propchange_with_unset_property_sends_empty_value() {
        let repos = FixtureRepository::new(42);
        let conf = "[general]\ndiff = diff %(from)s %(to)s\n\n[defaults]\nfor_paths = .*\n";
        let (cfg, rules) = setup(conf);
        let mut out = CaptureBackend::new();
        deliver_propchange(&cfg, &rules, &repos, "bob", "svn:author", &mut out).unwrap();
        assert!(out.messages()[0].ends_with("New Property Value:\n"));
    }
}
