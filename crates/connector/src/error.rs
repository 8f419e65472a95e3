use std::fmt;

use idbridge_engine::EngineError;
use idbridge_platform::PlatformError;

#[derive(Debug)]
pub enum ConnectorError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty attribute list, bad score, etc.).
    ConfigValidation(String),
    /// The configured reconciliation source does not exist on the tenant.
    SourceNotFound(String),
    /// None of the configured reviewers resolve to an identity.
    NoReviewers,
    /// The email workflow could not be found or created.
    Workflow(String),
    /// Platform API failure.
    Platform(PlatformError),
    /// Engine failure (form build, decision extraction).
    Engine(EngineError),
    /// IO error (config read, output write).
    Io(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SourceNotFound(id) => write!(f, "source '{id}' was not found on the tenant"),
            Self::NoReviewers => write!(
                f,
                "unable to find any reviewer from the configured list; check the values exist"
            ),
            Self::Workflow(msg) => write!(f, "email workflow error: {msg}"),
            Self::Platform(err) => write!(f, "platform error: {err}"),
            Self::Engine(err) => write!(f, "engine error: {err}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ConnectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Platform(err) => Some(err),
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlatformError> for ConnectorError {
    fn from(err: PlatformError) -> Self {
        Self::Platform(err)
    }
}

impl From<EngineError> for ConnectorError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}
