/// Error type for platform API operations.
#[derive(Debug)]
pub enum PlatformError {
    /// Token endpoint rejected the credentials
    Auth(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// Server returned a validation error (4xx with message)
    Validation(String),
    /// Requested object does not exist
    NotFound(String),
}

impl PlatformError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Network(_) => true,
            PlatformError::Http(code, _) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Auth(msg) => write!(f, "Authentication failed: {}", msg),
            PlatformError::Network(msg) => write!(f, "Network error: {}", msg),
            PlatformError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            PlatformError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PlatformError::Validation(msg) => write!(f, "{}", msg),
            PlatformError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(PlatformError::Network("reset".into()).is_retryable());
        assert!(PlatformError::Http(429, String::new()).is_retryable());
        assert!(PlatformError::Http(503, String::new()).is_retryable());
        assert!(!PlatformError::Http(404, String::new()).is_retryable());
        assert!(!PlatformError::Validation("bad".into()).is_retryable());
    }
}
