//! Intent classification through a responder adapter.

use std::sync::Arc;

use responder_core::{hash_prompt, ChatTurn, Responder, ResponderError, ResponderInputs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::adapter::{AdapterConfig, ResponderAdapter};
use crate::metrics::ResponderMetricsSnapshot;
use crate::state::{ExecutionRecord, ValidationRecord};
use crate::validator;

/// Intent label, confidence and the keywords that drove the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Classification {
    /// The classification used when the classifier fails.
    pub fn fallback(safe_default_intent: impl Into<String>) -> Self {
        Self {
            intent: safe_default_intent.into(),
            confidence: 0.0,
            keywords: Vec::new(),
        }
    }

    /// Lowercase the intent and clamp confidence into [0, 1].
    fn normalized(mut self) -> Self {
        self.intent = self.intent.trim().to_lowercase();
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

/// What the classifier produced for one request.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub execution: ExecutionRecord,
    /// Why the fallback classification was used, if it was.
    pub error: Option<String>,
}

impl ClassificationResult {
    fn fallback(execution: ExecutionRecord, safe_default_intent: &str, error: String) -> Self {
        Self {
            classification: Classification::fallback(safe_default_intent),
            execution,
            error: Some(error),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Maps `(question, history)` to a [`Classification`] via a wrapped responder.
///
/// Classification never fails the request: any adapter failure or
/// unparsable output yields the caller's safe default with confidence 0.0.
pub struct IntentClassifier {
    adapter: ResponderAdapter,
    prompt: String,
    prompt_hash: String,
}

impl IntentClassifier {
    /// Wrap `responder` in an adapter configured by `config`.
    ///
    /// The adapter's output check is replaced with a parse check, so
    /// malformed classifier output counts as a failed invocation.
    pub fn new(config: AdapterConfig, responder: Arc<dyn Responder>, prompt: String) -> Self {
        let adapter = ResponderAdapter::new(config, responder)
            .with_input_validator(validator::question_required())
            .with_output_validator(Arc::new(validate_classification));
        Self::from_adapter(adapter, prompt)
    }

    /// Use an already configured adapter.
    pub fn from_adapter(adapter: ResponderAdapter, prompt: String) -> Self {
        let prompt_hash = hash_prompt(&prompt);
        info!("Classifier prompt fingerprint: {}", prompt_hash);
        Self {
            adapter,
            prompt,
            prompt_hash,
        }
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn prompt_hash(&self) -> &str {
        &self.prompt_hash
    }

    pub fn metrics(&self) -> ResponderMetricsSnapshot {
        self.adapter.metrics()
    }

    pub async fn is_ready(&self) -> bool {
        self.adapter.is_ready().await
    }

    /// Classify a question, falling back to `safe_default_intent` on failure.
    pub async fn classify(
        &self,
        question: &str,
        history: &[ChatTurn],
        safe_default_intent: &str,
    ) -> ClassificationResult {
        let inputs = ResponderInputs::for_question(question, history)
            .with("system_prompt", self.prompt.clone())
            .with("prompt_hash", self.prompt_hash.clone());

        trace!(question = %question, history_turns = history.len(), "CLASSIFIER_INPUT");

        let outcome = self.adapter.invoke(inputs).await;

        let output = match outcome.output {
            Some(output) if outcome.success => output,
            _ => {
                let error = outcome
                    .error
                    .as_ref()
                    .map(ResponderError::to_string)
                    .unwrap_or_else(|| "classifier produced no output".to_string());
                warn!(error = %error, "CLASSIFIER_FAILED");
                return ClassificationResult::fallback(outcome.execution, safe_default_intent, error);
            }
        };

        trace!(raw_response = %output, "CLASSIFIER_RAW_RESPONSE");
        match parse_classification(&output) {
            Ok(classification) => {
                debug!(
                    intent = %classification.intent,
                    confidence = classification.confidence,
                    keywords = ?classification.keywords,
                    "CLASSIFIER_PARSED"
                );
                ClassificationResult {
                    classification,
                    execution: outcome.execution,
                    error: None,
                }
            }
            Err(error) => {
                warn!(error = %error, raw_response = %output, "CLASSIFIER_PARSE_FAILED");
                ClassificationResult::fallback(outcome.execution, safe_default_intent, error)
            }
        }
    }
}

/// Output check used by the classifier's adapter.
pub fn validate_classification(text: &str) -> ValidationRecord {
    let mut record = match parse_classification(text) {
        Ok(_) => ValidationRecord::valid(),
        Err(error) => ValidationRecord::invalid(error),
    };
    record.meta("stage", "classification");
    record
}

/// Parse classifier output that may be wrapped in prose or code fences.
pub fn parse_classification(response: &str) -> Result<Classification, String> {
    let json_str = extract_json(response);
    let classification = serde_json::from_str::<Classification>(json_str)
        .map_err(|e| format!("parse error: {}, response was: {}", e, response))?
        .normalized();

    if classification.intent.is_empty() {
        return Err("classification has an empty intent".to_string());
    }
    Ok(classification)
}

/// Extract a JSON object from a response that may contain markdown or other text.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with('{') {
        return extract_balanced_json(trimmed);
    }

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return extract_balanced_json(trimmed[json_start..json_start + end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_backticks = &trimmed[start + 3..];
        // Skip optional language identifier
        let json_start = after_backticks.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after_backticks[json_start..].find("```") {
            return extract_balanced_json(after_backticks[json_start..json_start + end].trim());
        }
    }

    if let Some(start) = trimmed.find('{') {
        return extract_balanced_json(&trimmed[start..]);
    }

    trimmed
}

/// Cut a string starting with '{' at its matching closing brace.
///
/// Models sometimes append stray braces or commentary after the object.
fn extract_balanced_json(s: &str) -> &str {
    if !s.starts_with('{') {
        return s;
    }

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &s[..=i];
                }
            }
            _ => {}
        }
    }

    s
}
