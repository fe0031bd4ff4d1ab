//! Keyword-driven classifier double.

use async_trait::async_trait;
use responder_core::{Responder, ResponderError, ResponderInputs};
use serde_json::json;

#[derive(Debug, Clone)]
struct Rule {
    keyword: String,
    intent: String,
    confidence: f64,
}

/// A classifier that emits `{intent, confidence, keywords}` JSON from keyword rules.
///
/// Rules are checked in insertion order against the lowercased question;
/// the first match wins, otherwise the default classification is used.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    name: String,
    rules: Vec<Rule>,
    default_intent: String,
    default_confidence: f64,
    fenced: bool,
}

impl ScriptedClassifier {
    /// A classifier that always answers the same intent and confidence.
    pub fn fixed(intent: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: "intent_classifier".to_string(),
            rules: Vec::new(),
            default_intent: intent.into(),
            default_confidence: confidence,
            fenced: false,
        }
    }

    /// Add a keyword rule.
    pub fn rule(mut self, keyword: impl Into<String>, intent: impl Into<String>, confidence: f64) -> Self {
        self.rules.push(Rule {
            keyword: keyword.into().to_lowercase(),
            intent: intent.into(),
            confidence,
        });
        self
    }

    /// Wrap the JSON in a markdown code fence, like chatty models do.
    pub fn fenced(mut self) -> Self {
        self.fenced = true;
        self
    }
}

#[async_trait]
impl Responder for ScriptedClassifier {
    async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
        let question = inputs.require_string("question")?.to_lowercase();

        let (intent, confidence, keywords) = self
            .rules
            .iter()
            .find(|rule| question.contains(&rule.keyword))
            .map(|rule| (rule.intent.as_str(), rule.confidence, vec![rule.keyword.clone()]))
            .unwrap_or((self.default_intent.as_str(), self.default_confidence, Vec::new()));

        let body = json!({
            "intent": intent,
            "confidence": confidence,
            "keywords": keywords,
        })
        .to_string();

        if self.fenced {
            Ok(format!("Here is the classification:\n```json\n{}\n```", body))
        } else {
            Ok(body)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_rule_match() {
        let classifier = ScriptedClassifier::fixed("general", 0.5).rule("botox", "sales", 0.95);
        let output = classifier
            .invoke(ResponderInputs::for_question("¿Cuánto cuesta el BOTOX?", &[]))
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["intent"], "sales");
        assert_eq!(parsed["confidence"], 0.95);
        assert_eq!(parsed["keywords"][0], "botox");
    }

    #[tokio::test]
    async fn test_default_classification() {
        let classifier = ScriptedClassifier::fixed("general", 0.4);
        let output = classifier
            .invoke(ResponderInputs::for_question("hello", &[]))
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["intent"], "general");
        assert_eq!(parsed["keywords"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_fenced_output() {
        let classifier = ScriptedClassifier::fixed("support", 0.8).fenced();
        let output = classifier
            .invoke(ResponderInputs::for_question("billing issue", &[]))
            .await
            .unwrap();
        assert!(output.contains("```json"));
    }
}
