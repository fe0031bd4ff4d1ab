//! Responders that fail, panic, or recover after failing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use responder_core::{Responder, ResponderError, ResponderInputs};

/// A responder that fails every invocation with the same error.
#[derive(Debug)]
pub struct FailingResponder {
    name: String,
    error: ResponderError,
    calls: AtomicUsize,
}

impl FailingResponder {
    pub fn new(name: impl Into<String>, error: ResponderError) -> Self {
        Self {
            name: name.into(),
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// A responder whose backend is down.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self::new(name, ResponderError::Unavailable("backend offline".to_string()))
    }

    /// Number of times this responder has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for FailingResponder {
    async fn invoke(&self, _inputs: ResponderInputs) -> Result<String, ResponderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_ready(&self) -> bool {
        false
    }
}

/// A responder that panics on every invocation.
#[derive(Debug, Clone)]
pub struct PanickingResponder {
    name: String,
}

impl PanickingResponder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Responder for PanickingResponder {
    async fn invoke(&self, _inputs: ResponderInputs) -> Result<String, ResponderError> {
        panic!("{} blew up", self.name);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A responder that fails its first `failures` calls, then delegates.
pub struct FlakyResponder {
    inner: Arc<dyn Responder>,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyResponder {
    pub fn new(inner: Arc<dyn Responder>, failures: usize) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times this responder has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for FlakyResponder {
    async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ResponderError::InvocationFailed(format!(
                "transient failure {} of {}",
                call + 1,
                self.failures
            )));
        }
        self.inner.invoke(inputs).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticResponder;

    #[tokio::test]
    async fn test_failing_responder() {
        let responder = FailingResponder::unavailable("emergency");
        let result = responder.invoke(ResponderInputs::new()).await;
        assert!(matches!(result, Err(ResponderError::Unavailable(_))));
        assert_eq!(responder.calls(), 1);
        assert!(!responder.is_ready().await);
    }

    #[tokio::test]
    async fn test_flaky_recovers() {
        let inner = Arc::new(StaticResponder::new("support", "We'll call you back shortly."));
        let responder = FlakyResponder::new(inner, 2);

        assert!(responder.invoke(ResponderInputs::new()).await.is_err());
        assert!(responder.invoke(ResponderInputs::new()).await.is_err());
        let reply = responder.invoke(ResponderInputs::new()).await.unwrap();

        assert_eq!(reply, "We'll call you back shortly.");
        assert_eq!(responder.calls(), 3);
        assert_eq!(responder.name(), "support");
    }
}
