//! Conversation history entries passed to responders.
//!
//! History is read-only input to the orchestrator; storing it across
//! requests is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    /// Get the role as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a turn with an explicit timestamp.
    pub fn new(role: ChatRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Create a user turn stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content, Utc::now())
    }

    /// Create an assistant turn stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content, Utc::now())
    }

    /// Create a system turn stamped now.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = ChatTurn::user("hola");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hola");
    }

    #[test]
    fn test_parse_turn() {
        let json = r#"{"role": "assistant", "content": "Hi!", "timestamp": "2024-05-01T10:00:00Z"}"#;
        let turn: ChatTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.role, ChatRole::Assistant);
        assert_eq!(turn.role.as_str(), "assistant");
    }
}
