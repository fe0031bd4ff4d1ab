//! Delayed responder - wraps another responder with artificial latency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use responder_core::{Responder, ResponderError, ResponderInputs};
use tokio::time::sleep;

/// A responder that wraps another responder and adds artificial delay.
///
/// Useful for testing timeout handling and simulating backend latency.
pub struct DelayedResponder {
    inner: Arc<dyn Responder>,
    delay: Duration,
}

impl DelayedResponder {
    /// Create a new DelayedResponder wrapping the given responder with the specified delay.
    pub fn new(inner: Arc<dyn Responder>, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create a responder with a delay in milliseconds.
    pub fn with_millis(inner: Arc<dyn Responder>, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl Responder for DelayedResponder {
    async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
        sleep(self.delay).await;
        self.inner.invoke(inputs).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_ready(&self) -> bool {
        self.inner.is_ready().await
    }
}
