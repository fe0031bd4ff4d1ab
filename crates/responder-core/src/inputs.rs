//! Input map handed to a responder invocation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResponderError;
use crate::history::ChatTurn;

/// String-keyed JSON inputs for a single responder invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponderInputs {
    values: HashMap<String, Value>,
}

impl ResponderInputs {
    /// Create an empty input map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the standard inputs for a question and its history.
    pub fn for_question(question: impl Into<String>, history: &[ChatTurn]) -> Self {
        Self::new()
            .with("question", question.into())
            .with_history(history)
    }

    /// Set an input value, consuming and returning the map.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Attach the chat history under the `chat_history` key.
    pub fn with_history(self, history: &[ChatTurn]) -> Self {
        let value = serde_json::to_value(history).unwrap_or(Value::Array(Vec::new()));
        self.with("chat_history", value)
    }

    /// Set an input value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a raw input value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string input by name.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string input, or return an invalid-input error.
    pub fn require_string(&self, key: &str) -> Result<&str, ResponderError> {
        self.get_string(key)
            .ok_or_else(|| ResponderError::InvalidInput(format!("missing required input: {}", key)))
    }

    /// Get a numeric input by name.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(|v| v.as_f64())
    }

    /// Decode the `chat_history` input, if present and well-formed.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.values
            .get("chat_history")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_question() {
        let history = vec![ChatTurn::user("Hola"), ChatTurn::assistant("¡Hola! ¿En qué te ayudo?")];
        let inputs = ResponderInputs::for_question("¿Cuánto cuesta el botox?", &history);

        assert_eq!(inputs.get_string("question"), Some("¿Cuánto cuesta el botox?"));
        assert_eq!(inputs.history(), history);
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn test_require_string_missing() {
        let inputs = ResponderInputs::new().with("intent", "sales");
        assert_eq!(inputs.require_string("intent").unwrap(), "sales");
        assert!(matches!(
            inputs.require_string("question"),
            Err(ResponderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_numeric_input() {
        let inputs = ResponderInputs::new().with("confidence", 0.95);
        assert_eq!(inputs.get_f64("confidence"), Some(0.95));
        assert!(inputs.get_string("confidence").is_none());
    }

    #[test]
    fn test_missing_history_is_empty() {
        let inputs = ResponderInputs::new().with("chat_history", "not a list");
        assert!(inputs.history().is_empty());
    }
}
