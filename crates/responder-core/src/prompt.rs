//! Classifier prompt loading and fingerprinting.

use std::env;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

/// Default path for the classifier prompt file.
pub const DEFAULT_CLASSIFIER_PROMPT_FILE: &str = "CLASSIFIER_PROMPT.md";

/// Embedded classifier prompt (fallback if no env var or file is present).
pub const DEFAULT_CLASSIFIER_PROMPT: &str = r#"You are an intent classifier for a clinic's patient assistant. Read the patient's question and the recent conversation, then classify the request.

Output a single JSON object with these fields:
- "intent": one of "sales", "emergency", "support", "scheduling", "general"
- "confidence": a number between 0 and 1
- "keywords": the words from the question that drove your decision

Guidelines:
- Prices, treatments, promotions: "sales"
- Pain, bleeding, allergic reaction, anything urgent after a procedure: "emergency"
- Account, billing, complaints, follow-up care questions: "support"
- Booking, moving or cancelling appointments: "scheduling"
- Anything else: "general"
- If you are unsure, lower the confidence instead of guessing.

Examples:
[QUESTION: ¿Cuánto cuesta el botox?]
→ {"intent": "sales", "confidence": 0.95, "keywords": ["cuesta", "botox"]}

[QUESTION: my lip is very swollen since yesterday's filler]
→ {"intent": "emergency", "confidence": 0.97, "keywords": ["swollen", "filler"]}

Respond with JSON only. No explanation."#;

/// Compute a stable SHA-256 fingerprint for a prompt string.
pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Load the classifier system prompt.
///
/// Priority:
/// 1. `CLASSIFIER_SYSTEM_PROMPT` env var (if set)
/// 2. Contents of prompt file (`CLASSIFIER_PROMPT_FILE` or default `CLASSIFIER_PROMPT.md`)
/// 3. Embedded default prompt
pub fn load_classifier_prompt() -> String {
    if let Ok(prompt) = env::var("CLASSIFIER_SYSTEM_PROMPT") {
        info!("Using classifier prompt from CLASSIFIER_SYSTEM_PROMPT env var");
        return prompt;
    }

    let prompt_file = env::var("CLASSIFIER_PROMPT_FILE")
        .unwrap_or_else(|_| DEFAULT_CLASSIFIER_PROMPT_FILE.to_string());

    if let Some(prompt) = load_prompt_file(&prompt_file) {
        info!("Loaded classifier prompt from {}", prompt_file);
        return prompt;
    }

    info!("Using embedded default classifier prompt");
    DEFAULT_CLASSIFIER_PROMPT.to_string()
}

/// Read a prompt file, ignoring missing or blank files.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let content = std::fs::read_to_string(path.as_ref()).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
