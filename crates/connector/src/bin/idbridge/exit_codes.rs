//! CLI exit code registry.
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — schedulers rely on them.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | General error (unspecified)               |
//! | 2    | Usage error (bad args, unreadable file)   |
//! | 10   | Invalid config                            |
//! | 11   | Configured source not found on the tenant |
//! | 12   | No configured reviewer resolves           |
//! | 13   | Platform API failure                      |

use idbridge_connector::ConnectorError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable config file.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_CONFIG: u8 = 10;

/// The configured virtual source does not exist.
pub const EXIT_SOURCE_NOT_FOUND: u8 = 11;

/// None of the configured reviewers resolve to an identity.
pub const EXIT_NO_REVIEWERS: u8 = 12;

/// Platform API failure (auth, network, HTTP).
pub const EXIT_PLATFORM: u8 = 13;

pub fn for_error(err: &ConnectorError) -> u8 {
    match err {
        ConnectorError::ConfigParse(_) | ConnectorError::ConfigValidation(_) => EXIT_CONFIG,
        ConnectorError::SourceNotFound(_) => EXIT_SOURCE_NOT_FOUND,
        ConnectorError::NoReviewers => EXIT_NO_REVIEWERS,
        ConnectorError::Platform(_) | ConnectorError::Workflow(_) => EXIT_PLATFORM,
        ConnectorError::Io(_) => EXIT_USAGE,
        ConnectorError::Engine(_) => EXIT_ERROR,
    }
}
