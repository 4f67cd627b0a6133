//! Typed configuration structs.
//!
//! Every INI section becomes an explicit struct rather than a bag of dynamic
//! attributes: `[general]` maps to [`GeneralConfig`], `[defaults]` and every
//! named group map to [`GroupOptions`].

/// Global delivery settings from the `[general]` section.
#[derive(Debug, Clone, Default)]
pub struct GeneralConfig {
    /// External diff command template, `%(token)s`-substituted per invocation.
    pub diff: String,
    /// Mail submission command for the pipe transport (e.g. `/usr/sbin/sendmail`).
    pub mail_command: Option<String>,
    /// SMTP server, `host` or `host:port`.
    pub smtp_hostname: Option<String>,
    /// Optional SMTP login.
    pub smtp_username: Option<String>,
    /// Optional SMTP password (used with `smtp_username`).
    pub smtp_password: Option<String>,
}

/// Options of one group section (or of `[defaults]`).
///
/// All fields are optional; lookups fall back from the group section to
/// `[defaults]` per option. String values may contain `%(param)s`
/// placeholders, interpolated at lookup time against the resolved
/// ParameterSet.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Regex matched against the canonical repository path; a non-match
    /// excludes the group from the run entirely.
    pub for_repos: Option<String>,
    /// Regex matched against each changed path (default: match everything).
    pub for_paths: Option<String>,
    /// Whitespace-separated recipient list.
    pub to_addr: Option<String>,
    /// Sender address; falls back to the commit author.
    pub from_addr: Option<String>,
    /// Optional `Reply-To:` header value.
    pub reply_to: Option<String>,
    /// Prefix for commit notification subjects.
    pub commit_subject_prefix: Option<String>,
    /// Prefix for revision-property-change notification subjects.
    pub propchange_subject_prefix: Option<String>,
    /// Space-separated list of diff categories to render
    /// (`add copy delete modify`).
    pub generate_diffs: Option<String>,
    /// Deprecated: `yes` disables diffs for additions. Honored only when
    /// `generate_diffs` is unset.
    pub suppress_adds: Option<String>,
    /// Deprecated: `yes` disables diffs for deletions. Honored only when
    /// `generate_diffs` is unset.
    pub suppress_deletes: Option<String>,
    /// Canonical diff policy, resolved once at load time.
    pub diff_policy: DiffPolicy,
}

/// Which change categories produce diff bodies.
///
/// Resolved once per group at configuration load, collapsing the
/// `generate_diffs` list and the deprecated suppression booleans into a
/// single policy checked by the diff renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPolicy {
    pub add: bool,
    pub copy: bool,
    pub delete: bool,
    pub modify: bool,
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            add: true,
            copy: true,
            delete: true,
            modify: true,
        }
    }
}

impl DiffPolicy {
    /// Resolve the effective policy for one group.
    ///
    /// A non-empty `generate_diffs` list wins outright; otherwise all
    /// categories are enabled and the deprecated booleans knock out adds and
    /// deletes. Unrecognized list items are ignored, as the original
    /// implementations did.
    pub fn resolve(
        generate_diffs: Option<&str>,
        suppress_adds: bool,
        suppress_deletes: bool,
    ) -> Self {
        match generate_diffs {
            Some(list) if !list.trim().is_empty() => {
                let mut policy = Self {
                    add: false,
                    copy: false,
                    delete: false,
                    modify: false,
                };
                for item in list.split_whitespace() {
                    match item {
                        "add" => policy.add = true,
                        "copy" => policy.copy = true,
                        "delete" => policy.delete = true,
                        "modify" => policy.modify = true,
                        _ => {}
                    }
                }
                policy
            }
            _ => Self {
                add: !suppress_adds,
                delete: !suppress_deletes,
                ..Self::default()
            },
        }
    }
}
