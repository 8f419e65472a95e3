use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// Form construction error (entity missing data the form needs).
    FormBuild(String),
    /// A completed form instance carries no usable decision.
    Decision(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormBuild(msg) => write!(f, "form build error: {msg}"),
            Self::Decision(msg) => write!(f, "decision error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
