//! Stateless validation of request inputs and responder outputs.
//!
//! Every check returns a [`ValidationRecord`]; validation failures are data,
//! never errors.

use std::sync::Arc;

use responder_core::{ChatTurn, ResponderInputs};

use crate::state::ValidationRecord;

/// Longest accepted user or company identifier.
pub const MAX_ID_CHARS: usize = 128;

/// Default minimum length for a responder reply.
pub const DEFAULT_MIN_RESPONSE_CHARS: usize = 10;

/// Validates the inputs an adapter is about to pass to its responder.
pub type InputValidator = Arc<dyn Fn(&ResponderInputs) -> ValidationRecord + Send + Sync>;

/// Validates the text a responder produced.
pub type OutputValidator = Arc<dyn Fn(&str) -> ValidationRecord + Send + Sync>;

/// Limits applied to an incoming request.
#[derive(Debug, Clone)]
pub struct InputPolicy {
    pub max_question_chars: usize,
    pub history_warning_turns: usize,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self {
            max_question_chars: 4000,
            history_warning_turns: 50,
        }
    }
}

/// Validate the caller-supplied request.
///
/// `company_known` is false only when the company registry is strict and
/// has no entry for `company_id`.
pub fn validate_request(
    question: &str,
    user_id: &str,
    company_id: &str,
    history: &[ChatTurn],
    policy: &InputPolicy,
    company_known: bool,
) -> ValidationRecord {
    let mut record = ValidationRecord::valid();
    let question_chars = question.trim().chars().count();

    if question_chars == 0 {
        record.error("question is empty");
    } else if question_chars > policy.max_question_chars {
        record.error(format!(
            "question is {} characters, limit is {}",
            question_chars, policy.max_question_chars
        ));
    }

    check_identifier(&mut record, "user_id", user_id);
    check_identifier(&mut record, "company_id", company_id);

    if !company_id.trim().is_empty() && !company_known {
        record.error(format!("company_id {} is not registered", company_id));
    }

    if history.len() > policy.history_warning_turns {
        record.warn(format!(
            "chat_history has {} turns, only recent context is useful",
            history.len()
        ));
    }
    let blank_turns = history.iter().filter(|t| t.content.trim().is_empty()).count();
    if blank_turns > 0 {
        record.warn(format!("chat_history has {} empty turn(s)", blank_turns));
    }

    record.meta("stage", "input");
    record.meta("question_chars", question_chars);
    record.meta("history_turns", history.len());
    record
}

fn check_identifier(record: &mut ValidationRecord, field: &str, value: &str) {
    if value.trim().is_empty() {
        record.error(format!("{} is missing", field));
    } else if value.chars().any(char::is_whitespace) {
        record.error(format!("{} contains whitespace", field));
    } else if value.chars().count() > MAX_ID_CHARS {
        record.error(format!("{} exceeds {} characters", field, MAX_ID_CHARS));
    }
}

/// Validate a responder reply: it must be non-empty and at least `min_chars` long.
pub fn validate_output(text: &str, min_chars: usize) -> ValidationRecord {
    let mut record = ValidationRecord::valid();
    let chars = text.trim().chars().count();

    if chars == 0 {
        record.error("response is empty");
    } else if chars < min_chars {
        record.error(format!(
            "response is {} characters, minimum is {}",
            chars, min_chars
        ));
    }

    record.meta("stage", "output");
    record.meta("output_chars", chars);
    record
}

/// Default adapter input check: a non-blank `question` must be present.
pub fn require_question(inputs: &ResponderInputs) -> ValidationRecord {
    match inputs.get_string("question") {
        Some(q) if !q.trim().is_empty() => ValidationRecord::valid(),
        Some(_) => ValidationRecord::invalid("question is empty"),
        None => ValidationRecord::invalid("missing required input: question"),
    }
}

/// Build an output validator enforcing `min_chars`.
pub fn min_length(min_chars: usize) -> OutputValidator {
    Arc::new(move |text: &str| validate_output(text, min_chars))
}

/// Build the default input validator.
pub fn question_required() -> InputValidator {
    Arc::new(require_question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> InputPolicy {
        InputPolicy::default()
    }

    #[test]
    fn test_valid_request() {
        let record = validate_request("¿Cuánto cuesta el botox?", "u-1", "clinic-9", &[], &policy(), true);
        assert!(record.is_valid);
        assert!(record.errors.is_empty());
        assert_eq!(record.metadata["question_chars"], 24);
        assert_eq!(record.metadata["history_turns"], 0);
    }

    #[test]
    fn test_blank_question_rejected() {
        let record = validate_request("   \n", "u-1", "clinic-9", &[], &policy(), true);
        assert!(!record.is_valid);
        assert_eq!(record.errors, vec!["question is empty".to_string()]);
    }

    #[test]
    fn test_long_question_rejected() {
        let policy = InputPolicy {
            max_question_chars: 5,
            ..InputPolicy::default()
        };
        let record = validate_request("too long question", "u-1", "c", &[], &policy, true);
        assert!(!record.is_valid);
        assert!(record.errors[0].contains("limit is 5"));
    }

    #[test]
    fn test_identifiers_checked() {
        let record = validate_request("hello there", "", "clinic 9", &[], &policy(), true);
        assert!(!record.is_valid);
        assert!(record.errors.contains(&"user_id is missing".to_string()));
        assert!(record.errors.contains(&"company_id contains whitespace".to_string()));

        let long_id = "x".repeat(MAX_ID_CHARS + 1);
        let record = validate_request("hello there", &long_id, "c", &[], &policy(), true);
        assert!(record.errors[0].contains("user_id exceeds"));
    }

    #[test]
    fn test_unknown_company_rejected() {
        let record = validate_request("hello there", "u-1", "clinic-404", &[], &policy(), false);
        assert!(!record.is_valid);
        assert_eq!(record.errors, vec!["company_id clinic-404 is not registered".to_string()]);
    }

    #[test]
    fn test_history_warnings() {
        let policy = InputPolicy {
            history_warning_turns: 1,
            ..InputPolicy::default()
        };
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("  ")];
        let record = validate_request("hello there", "u-1", "c", &history, &policy, true);
        assert!(record.is_valid);
        assert_eq!(record.warnings.len(), 2);
    }

    #[test]
    fn test_validate_output() {
        assert!(validate_output("Botox starts at $300 per area.", 10).is_valid);

        let empty = validate_output("  ", 10);
        assert!(!empty.is_valid);
        assert_eq!(empty.errors, vec!["response is empty".to_string()]);

        let short = validate_output("ok", 10);
        assert!(!short.is_valid);
        assert_eq!(short.metadata["output_chars"], 2);
    }

    #[test]
    fn test_require_question() {
        assert!(require_question(&ResponderInputs::for_question("hi", &[])).is_valid);
        assert!(!require_question(&ResponderInputs::for_question(" ", &[])).is_valid);
        assert!(!require_question(&ResponderInputs::new()).is_valid);
    }

    #[test]
    fn test_min_length_validator() {
        let validator = min_length(3);
        assert!(validator("yes").is_valid);
        assert!(!validator("no").is_valid);
    }
}
