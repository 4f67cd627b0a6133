//! Error types for the revmail CLI.
//!
//! Uses thiserror for derive macros. Every variant maps to a specific exit
//! code. A failure anywhere aborts the whole run; there is no partial-success
//! reporting, matching the batch nature of a commit hook.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for revmail operations.
#[derive(Error, Debug)]
pub enum MailerError {
    /// No configuration file could be resolved.
    #[error("configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// The configuration file is unparseable or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository could not be read.
    #[error("repository access failed: {0}")]
    Repository(String),

    /// A notification could not be delivered.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// I/O failure while streaming notification content.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailerError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MailerError::ConfigMissing(_) => exit_codes::CONFIG_FAILURE,
            MailerError::Config(_) => exit_codes::CONFIG_FAILURE,
            MailerError::Repository(_) => exit_codes::REPOSITORY_FAILURE,
            MailerError::Delivery(_) => exit_codes::DELIVERY_FAILURE,
            MailerError::Io(_) => exit_codes::DELIVERY_FAILURE,
        }
    }
}

/// Result type alias for revmail operations.
pub type Result<T> = std::result::Result<T, MailerError>;
