//! Error types for orchestrator operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or configuring an orchestrator.
///
/// A request run never returns these; failures inside a run are recorded
/// as [`FailureKind`] entries in the request state.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The routing table names a responder that was never registered.
    #[error("unknown responder: {0}")]
    UnknownResponder(String),

    /// A configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure categories recorded in a request's error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request was rejected before any responder ran.
    InputValidation,
    /// The classifier failed; routing fell back to the safe default.
    ClassificationFailed,
    /// A responder exceeded its deadline on every attempt.
    ResponderTimeout,
    /// A responder returned an error or panicked.
    ResponderInvocation,
    /// A responder replied with empty or too-short output.
    OutputValidation,
    /// Primary and fallback responders both failed.
    EscalationExhausted,
    /// The caller's deadline passed at a state boundary.
    DeadlineExceeded,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputValidation => "input_validation",
            Self::ClassificationFailed => "classification_failed",
            Self::ResponderTimeout => "responder_timeout",
            Self::ResponderInvocation => "responder_invocation",
            Self::OutputValidation => "output_validation",
            Self::EscalationExhausted => "escalation_exhausted",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::EscalationExhausted.to_string(), "escalation_exhausted");
        assert_eq!(FailureKind::ResponderTimeout.to_string(), "responder_timeout");
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::UnknownResponder("billing".to_string());
        assert_eq!(err.to_string(), "unknown responder: billing");
    }
}
