//! Exit code constants for the revmail CLI.
//!
//! - 0: Success
//! - 1: User error (bad arguments, unknown subcommand)
//! - 2: Configuration error (missing or unreadable config file)
//! - 3: Repository access failure
//! - 4: Delivery failure (mail subprocess, SMTP transport, broken stream)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid invocation.
pub const USER_ERROR: i32 = 1;

/// Configuration error: config file missing, unparseable, or inconsistent.
pub const CONFIG_FAILURE: i32 = 2;

/// Repository access failure: svnlook errors, unreadable revisions.
pub const REPOSITORY_FAILURE: i32 = 3;

/// Delivery failure: mail subprocess exit, SMTP error, broken output stream.
pub const DELIVERY_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            CONFIG_FAILURE,
            REPOSITORY_FAILURE,
            DELIVERY_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
