//! Error types for responder invocations.

use thiserror::Error;

/// Errors a responder (or the adapter wrapping it) can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponderError {
    /// The responder is temporarily unavailable.
    #[error("responder unavailable: {0}")]
    Unavailable(String),

    /// The invocation failed inside the responder.
    #[error("invocation failed: {0}")]
    InvocationFailed(String),

    /// The invocation did not finish within its deadline.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The inputs were rejected before the responder was called.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The responder produced output that failed validation.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// The responder task panicked.
    #[error("responder panicked: {0}")]
    Panicked(String),

    /// The responder is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ResponderError {
    /// Whether another attempt against the same responder may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::InvocationFailed(_) | Self::Timeout(_) | Self::Panicked(_)
        )
    }

    /// Whether this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ResponderError::Timeout(100).is_retryable());
        assert!(ResponderError::Unavailable("down".into()).is_retryable());
        assert!(ResponderError::InvocationFailed("boom".into()).is_retryable());
        assert!(ResponderError::Panicked("oops".into()).is_retryable());
        assert!(!ResponderError::InvalidInput("empty".into()).is_retryable());
        assert!(!ResponderError::InvalidOutput("short".into()).is_retryable());
        assert!(!ResponderError::Configuration("missing".into()).is_retryable());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(ResponderError::Timeout(250).to_string(), "timed out after 250 ms");
    }
}
