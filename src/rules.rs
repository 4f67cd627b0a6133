//! Group routing rules.
//!
//! Compiles the configured groups into ordered `(pattern, parameters)` rules
//! and matches changed paths against them. Matching is inclusive: every group
//! whose repository filter and path filter both pass contributes one
//! `(group, ParameterSet)` entry, so a single commit can notify several
//! audiences. Patterns are anchored at the start of the subject, matching the
//! semantics the configuration format was written for.

use crate::config::Config;
use crate::error::{MailerError, Result};
use crate::params::ParameterSet;
use regex::{Captures, Regex};
use std::path::Path;

/// One compiled routing rule.
#[derive(Debug)]
struct Rule {
    /// `None` is the implicit default group from `[defaults].for_paths`.
    group: Option<String>,
    pattern: Regex,
    /// Base parameters: global parameters plus repository captures.
    params: ParameterSet,
}

/// The compiled rule list for one repository and one run.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    global: ParameterSet,
}

impl RuleSet {
    /// Compile the groups that apply to `repos_path`.
    ///
    /// Repository-level filtering happens here, once: a group whose
    /// `for_repos` pattern fails to match is excluded from the compiled set
    /// entirely. The implicit default group is appended after all explicit
    /// groups; its absence is legal.
    pub fn compile(cfg: &Config, repos_path: &Path, global: &ParameterSet) -> Result<RuleSet> {
        let repos_dir = repos_path.to_string_lossy();

        // Parameters for groups without their own repository filter: global
        // parameters extended by the [defaults].for_repos captures. A
        // non-matching defaults pattern is not an error, it just contributes
        // nothing.
        let mut default_params = global.clone();
        if let Some(pattern) = &cfg.defaults.for_repos {
            let re = compile_anchored(pattern)?;
            if let Some(caps) = re.captures(&repos_dir) {
                merge_named_captures(&mut default_params, &re, &caps);
            }
        }

        let mut rules = Vec::new();
        for (name, opts) in &cfg.groups {
            let mut params = default_params.clone();
            if let Some(pattern) = &opts.for_repos {
                let re = compile_anchored(pattern)?;
                match re.captures(&repos_dir) {
                    // The group does not apply to this repository at all.
                    None => continue,
                    Some(caps) => {
                        params = global.clone();
                        merge_named_captures(&mut params, &re, &caps);
                    }
                }
            }
            // No path pattern means the group matches every path.
            let pattern = compile_anchored(opts.for_paths.as_deref().unwrap_or(""))?;
            rules.push(Rule {
                group: Some(name.clone()),
                pattern,
                params,
            });
        }

        if let Some(pattern) = &cfg.defaults.for_paths {
            rules.push(Rule {
                group: None,
                pattern: compile_anchored(pattern)?,
                params: default_params,
            });
        }

        Ok(RuleSet {
            rules,
            global: global.clone(),
        })
    }

    /// All `(group, parameters)` pairs applicable to a changed path.
    ///
    /// Named captures from the path pattern override the rule's base
    /// parameters on key collision. When no rule matches, a single synthetic
    /// fallback pair `(None, global parameters)` is returned, so there is
    /// always at least one recipient context.
    pub fn matches(&self, path: &str) -> Vec<(Option<&str>, ParameterSet)> {
        let mut applicable = Vec::new();
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(path) {
                let mut params = rule.params.clone();
                merge_named_captures(&mut params, &rule.pattern, &caps);
                applicable.push((rule.group.as_deref(), params));
            }
        }
        if applicable.is_empty() {
            applicable.push((None, self.global.clone()));
        }
        applicable
    }
}

/// Compile a configured pattern anchored at the start of the subject.
fn compile_anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!(r"\A(?:{})", pattern))
        .map_err(|e| MailerError::Config(format!("bad pattern '{}': {}", pattern, e)))
}

/// Merge the named captures of a match into `params`. Unmatched optional
/// groups are skipped rather than inserted as empty values.
fn merge_named_captures(params: &mut ParameterSet, re: &Regex, caps: &Captures<'_>) {
    for name in re.capture_names().flatten() {
        if let Some(capture) = caps.name(name) {
            params.insert(name.to_string(), capture.as_str().to_string());
        }
    }
}
