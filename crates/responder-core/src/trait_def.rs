//! The Responder trait definition.

use async_trait::async_trait;

use crate::error::ResponderError;
use crate::inputs::ResponderInputs;

/// A component that produces a candidate reply (or a classification) for a request.
///
/// Implementations can range from canned test doubles to full NLG backends.
/// This trait is object-safe and can be used with `Arc<dyn Responder>`.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce output for the given inputs.
    ///
    /// Errors are reported as values; the orchestrator's adapter also
    /// contains panics and deadline expiry, so implementations need not
    /// guard against either.
    async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError>;

    /// Get the registry name for this responder.
    fn name(&self) -> &str;

    /// Check if the responder is ready to accept requests.
    ///
    /// Default implementation always returns true.
    async fn is_ready(&self) -> bool {
        true
    }
}
