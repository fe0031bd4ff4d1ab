//! Per-request state and the execution ledger it carries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use responder_core::ChatTurn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FailureKind;

/// States of the orchestration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    ValidatingInput,
    Classifying,
    Routing,
    ExecutingPrimary,
    ValidatingOutput,
    Escalating,
    ExecutingFallback,
    End,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ValidatingInput => "validating_input",
            Self::Classifying => "classifying",
            Self::Routing => "routing",
            Self::ExecutingPrimary => "executing_primary",
            Self::ValidatingOutput => "validating_output",
            Self::Escalating => "escalating",
            Self::ExecutingFallback => "executing_fallback",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one responder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// Audit record for one adapter invocation, including its internal retries.
///
/// Records are built once and never mutated after being appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub agent_name: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    /// Retries performed by the adapter after the first attempt.
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Result of one validation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

impl ValidationRecord {
    /// A passing record with no findings.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    /// A failing record with a single error.
    pub fn invalid(error: impl Into<String>) -> Self {
        let mut record = Self::valid();
        record.error(error);
        record
    }

    /// Add an error; the record becomes invalid.
    pub fn error(&mut self, error: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Errors joined into one line for logs.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Mutable state owned by a single orchestration run.
///
/// `question`, `user_id`, `company_id` and `chat_history` are inputs and are
/// never changed after creation. `executions`, `validations` and `errors`
/// only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub question: String,
    pub user_id: String,
    pub company_id: String,
    pub chat_history: Vec<ChatTurn>,

    pub intent: Option<String>,
    pub confidence: f64,
    pub keywords: Vec<String>,

    pub current_agent: Option<String>,
    pub agent_response: Option<String>,

    pub executions: Vec<ExecutionRecord>,
    pub validations: Vec<ValidationRecord>,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_execution: Option<ExecutionRecord>,

    pub retries: u32,
    pub max_retries: u32,
    pub should_retry: bool,

    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestState {
    pub fn new(
        question: impl Into<String>,
        user_id: impl Into<String>,
        company_id: impl Into<String>,
        chat_history: Vec<ChatTurn>,
        max_retries: u32,
    ) -> Self {
        Self {
            question: question.into(),
            user_id: user_id.into(),
            company_id: company_id.into(),
            chat_history,
            intent: None,
            confidence: 0.0,
            keywords: Vec::new(),
            current_agent: None,
            agent_response: None,
            executions: Vec::new(),
            validations: Vec::new(),
            errors: Vec::new(),
            classification_execution: None,
            retries: 0,
            max_retries,
            should_retry: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a responder execution and track the responder that produced it.
    pub fn record_execution(&mut self, record: ExecutionRecord) {
        self.current_agent = Some(record.agent_name.clone());
        if record.succeeded() {
            self.agent_response = record.output.clone();
        }
        self.executions.push(record);
    }

    pub fn record_validation(&mut self, record: ValidationRecord) {
        self.validations.push(record);
    }

    pub fn record_error(&mut self, kind: FailureKind, detail: impl fmt::Display) {
        self.errors.push(format!("{}: {}", kind, detail));
    }

    /// Whether another escalation is permitted.
    pub fn can_escalate(&self) -> bool {
        self.retries < self.max_retries
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Most recent execution, if any.
    pub fn last_execution(&self) -> Option<&ExecutionRecord> {
        self.executions.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent: &str, status: ExecutionStatus, output: Option<&str>) -> ExecutionRecord {
        ExecutionRecord {
            agent_name: agent.to_string(),
            status,
            duration_ms: 5,
            retries: 0,
            output: output.map(str::to_string),
            error: None,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = RequestState::new("hi", "u1", "c1", Vec::new(), 1);
        assert!(state.executions.is_empty());
        assert!(state.validations.is_empty());
        assert_eq!(state.retries, 0);
        assert!(state.can_escalate());
        assert!(!state.is_complete());
    }

    #[test]
    fn test_record_execution_updates_agent() {
        let mut state = RequestState::new("hi", "u1", "c1", Vec::new(), 1);
        state.record_execution(record("emergency", ExecutionStatus::Failed, None));
        assert_eq!(state.current_agent.as_deref(), Some("emergency"));
        assert!(state.agent_response.is_none());

        state.record_execution(record("support", ExecutionStatus::Success, Some("We're on it.")));
        assert_eq!(state.current_agent.as_deref(), Some("support"));
        assert_eq!(state.agent_response.as_deref(), Some("We're on it."));
        assert_eq!(state.executions.len(), 2);
    }

    #[test]
    fn test_validation_record_builders() {
        let mut record = ValidationRecord::valid();
        record.warn("history is long");
        assert!(record.is_valid);

        record.error("question is empty");
        record.error("user_id is missing");
        assert!(!record.is_valid);
        assert_eq!(record.summary(), "question is empty; user_id is missing");
    }

    #[test]
    fn test_record_error_format() {
        let mut state = RequestState::new("hi", "u1", "c1", Vec::new(), 1);
        state.record_error(FailureKind::ResponderTimeout, "emergency timed out after 30000 ms");
        assert_eq!(state.errors[0], "responder_timeout: emergency timed out after 30000 ms");
    }

    #[test]
    fn test_state_serializes_phase_and_status() {
        let json = serde_json::to_value(Phase::ExecutingFallback).unwrap();
        assert_eq!(json, "executing_fallback");
        let json = serde_json::to_value(ExecutionStatus::Failed).unwrap();
        assert_eq!(json, "failed");
    }
}
