//! Responders that always succeed.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use responder_core::{Responder, ResponderError, ResponderInputs};

/// A responder that returns the same reply for every request.
#[derive(Debug)]
pub struct StaticResponder {
    name: String,
    reply: String,
    calls: AtomicUsize,
}

impl StaticResponder {
    /// Create a responder named `name` that always answers `reply`.
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times this responder has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for StaticResponder {
    async fn invoke(&self, _inputs: ResponderInputs) -> Result<String, ResponderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A responder that echoes the `question` input back.
#[derive(Debug, Clone)]
pub struct EchoResponder {
    name: String,
    prefix: Option<String>,
}

impl EchoResponder {
    /// Create an echo responder with no prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
        }
    }

    /// Create an echo responder with a custom prefix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_responder::EchoResponder;
    ///
    /// let responder = EchoResponder::with_prefix("general", "You asked: ");
    /// // Will respond with "You asked: <question>"
    /// ```
    pub fn with_prefix(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl Responder for EchoResponder {
    async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
        let question = inputs.require_string("question")?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, question),
            None => question.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
