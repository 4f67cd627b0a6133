//! Configuration loading for revmail.
//!
//! Reads the INI-style `mailer.conf`: a `[general]` section with global
//! delivery settings, an optional `[defaults]` section, and one section per
//! notification group. Sections are parsed into typed structs at load time;
//! per-group diff policies are resolved here as well, so the render path
//! never needs to consult deprecated options.

mod model;


pub use model::{DiffPolicy, GeneralConfig, GroupOptions};

use crate::error::{MailerError, Result};
use crate::params::{interpolate, ParameterSet};
use ini::{Ini, Properties};
use std::collections::BTreeMap;
use std::path::Path;

/// Section names that never describe a notification group.
const PREDEFINED_SECTIONS: [&str; 2] = ["general", "defaults"];

/// Parsed configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global delivery settings.
    pub general: GeneralConfig,
    /// Options of the `[defaults]` section, also the per-option fallback
    /// layer for every group.
    pub defaults: GroupOptions,
    /// Named notification groups.
    pub groups: BTreeMap<String, GroupOptions>,
    /// The `general.diff` template split into argument tokens.
    diff_template: Vec<String>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.is_file() {
            return Err(MailerError::ConfigMissing(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MailerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from INI text.
    pub fn parse(contents: &str) -> Result<Config> {
        let ini = Ini::load_from_str(contents)
            .map_err(|e| MailerError::Config(e.to_string()))?;

        let mut general = GeneralConfig::default();
        if let Some(props) = ini.section(Some("general")) {
            general.diff = props.get("diff").unwrap_or_default().to_string();
            general.mail_command = get_opt(props, "mail_command");
            general.smtp_hostname = get_opt(props, "smtp_hostname");
            general.smtp_username = get_opt(props, "smtp_username");
            general.smtp_password = get_opt(props, "smtp_password");
        }
        if general.diff.is_empty() {
            return Err(MailerError::Config(
                "missing required option 'diff' in [general]".to_string(),
            ));
        }
        let diff_template = shell_words::split(&general.diff).map_err(|e| {
            MailerError::Config(format!("unparseable diff command '{}': {}", general.diff, e))
        })?;
        if diff_template.is_empty() {
            return Err(MailerError::Config(
                "empty diff command in [general]".to_string(),
            ));
        }

        let mut defaults = parse_group(ini.section(Some("defaults")));
        defaults.diff_policy = DiffPolicy::resolve(
            defaults.generate_diffs.as_deref(),
            yes(defaults.suppress_adds.as_deref()),
            yes(defaults.suppress_deletes.as_deref()),
        );

        let mut groups = BTreeMap::new();
        for (section, props) in ini.iter() {
            let Some(name) = section else { continue };
            if PREDEFINED_SECTIONS.contains(&name) {
                continue;
            }
            let mut opts = parse_group(Some(props));
            // Per-option fallback to [defaults], then collapse into the
            // canonical policy.
            opts.diff_policy = DiffPolicy::resolve(
                opts.generate_diffs
                    .as_deref()
                    .or(defaults.generate_diffs.as_deref()),
                yes(opts
                    .suppress_adds
                    .as_deref()
                    .or(defaults.suppress_adds.as_deref())),
                yes(opts
                    .suppress_deletes
                    .as_deref()
                    .or(defaults.suppress_deletes.as_deref())),
            );
            groups.insert(name.to_string(), opts);
        }

        Ok(Config {
            general,
            defaults,
            groups,
            diff_template,
        })
    }

    /// Look up an option for a group, falling back to `[defaults]`, and
    /// interpolate it against `params`. Returns the empty string when the
    /// option is set nowhere.
    pub fn resolved<F>(
        &self,
        name: &str,
        group: Option<&str>,
        params: &ParameterSet,
        pick: F,
    ) -> Result<String>
    where
        F: for<'a> Fn(&'a GroupOptions) -> Option<&'a String>,
    {
        let raw = group
            .and_then(|g| self.groups.get(g))
            .and_then(|opts| pick(opts))
            .or_else(|| pick(&self.defaults));
        match raw {
            Some(template) => interpolate(template, params).map_err(|e| {
                MailerError::Config(format!(
                    "option '{}'{}: {}",
                    name,
                    group.map(|g| format!(" in group '{}'", g)).unwrap_or_default(),
                    e
                ))
            }),
            None => Ok(String::new()),
        }
    }

    /// The effective diff policy for a group (the default group's policy for
    /// `None`).
    pub fn diff_policy(&self, group: Option<&str>) -> DiffPolicy {
        group
            .and_then(|g| self.groups.get(g))
            .map(|opts| opts.diff_policy)
            .unwrap_or(self.defaults.diff_policy)
    }

    /// Build the external diff invocation: each template token is
    /// independently `%`-substituted against the label/path parameters.
    pub fn diff_command(&self, subs: &ParameterSet) -> Result<Vec<String>> {
        self.diff_template
            .iter()
            .map(|token| {
                interpolate(token, subs).map_err(|e| {
                    MailerError::Config(format!("diff command token '{}': {}", token, e))
                })
            })
            .collect()
    }
}

fn parse_group(props: Option<&Properties>) -> GroupOptions {
    let Some(props) = props else {
        return GroupOptions::default();
    };
    GroupOptions {
        for_repos: get_opt(props, "for_repos"),
        for_paths: get_opt(props, "for_paths"),
        to_addr: get_opt(props, "to_addr"),
        from_addr: get_opt(props, "from_addr"),
        reply_to: get_opt(props, "reply_to"),
        commit_subject_prefix: get_opt(props, "commit_subject_prefix"),
        propchange_subject_prefix: get_opt(props, "propchange_subject_prefix"),
        generate_diffs: get_opt(props, "generate_diffs"),
        suppress_adds: get_opt(props, "suppress_adds"),
        suppress_deletes: get_opt(props, "suppress_deletes"),
        diff_policy: DiffPolicy::default(),
    }
}

fn get_opt(props: &Properties, key: &str) -> Option<String> {
    props.get(key).map(str::to_string)
}

fn yes(value: Option<&str>) -> bool {
    matches!(value, Some("yes"))
}
