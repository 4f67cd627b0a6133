//! Parameter sets and `%(name)s` interpolation.
//!
//! Every configuration string value may reference resolved parameters with
//! Python-ConfigParser-style placeholders: `%(author)s`, `%(project)s`, and
//! so on. `%%` renders a literal percent sign.
//!
//! Interpolation is fail-safe: an unknown parameter name or a malformed
//! placeholder is an error rather than a silent empty substitution, which
//! prevents subtle bugs from typos in group configuration.

use std::collections::BTreeMap;
use std::fmt;

/// A resolved set of interpolation parameters.
///
/// Ordered so that `(group, parameter items)` pairs form a stable
/// deduplication key across a run.
pub type ParameterSet = BTreeMap<String, String>;

/// Error type for interpolation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// A parameter was referenced but not present in the set.
    UnknownParameter {
        /// The name of the missing parameter.
        name: String,
        /// The position in the template where the placeholder starts.
        position: usize,
    },
    /// A `%` was not followed by `(name)s` or a second `%`.
    MalformedPlaceholder {
        /// The position of the offending `%`.
        position: usize,
    },
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationError::UnknownParameter { name, position } => {
                write!(
                    f,
                    "unknown parameter '{}' at position {} in template",
                    name, position
                )
            }
            InterpolationError::MalformedPlaceholder { position } => {
                write!(f, "malformed '%' placeholder at position {}", position)
            }
        }
    }
}

impl std::error::Error for InterpolationError {}

/// Substitute `%(name)s` placeholders in `template` from `params`.
pub fn interpolate(
    template: &str,
    params: &ParameterSet,
) -> Result<String, InterpolationError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some((_, '%')) => {
                chars.next();
                result.push('%');
            }
            Some((_, '(')) => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, ')')) => break,
                        Some((_, c)) => name.push(c),
                        None => {
                            return Err(InterpolationError::MalformedPlaceholder {
                                position: pos,
                            });
                        }
                    }
                }
                // The conversion character must be `s`; nothing else is used
                // by mailer configurations.
                match chars.next() {
                    Some((_, 's')) => {}
                    _ => {
                        return Err(InterpolationError::MalformedPlaceholder { position: pos });
                    }
                }
                match params.get(&name) {
                    Some(value) => result.push_str(value),
                    None => {
                        return Err(InterpolationError::UnknownParameter {
                            name,
                            position: pos,
                        });
                    }
                }
            }
            _ => {
                return Err(InterpolationError::MalformedPlaceholder { position: pos });
            }
        }
    }

    Ok(result)
}

/// Helper to build a ParameterSet from a list of key-value pairs.
pub fn params<I, K, V>(pairs: I) -> ParameterSet
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
