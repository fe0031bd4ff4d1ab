//! Core trait and types for responder implementations.
//!
//! This crate provides the shared interface between the orchestrator and
//! every response-generating component it drives. It defines:
//!
//! - [`Responder`] - The trait that all responder implementations must implement
//! - [`ResponderInputs`] - The string-keyed input map passed to a responder
//! - [`ChatTurn`] / [`ChatRole`] - Conversation history entries
//! - [`ResponderError`] - Error types for responder invocations
//! - [`hash_prompt`] / [`load_classifier_prompt`] - Classifier prompt helpers
//!
//! # Example
//!
//! ```rust
//! use responder_core::{async_trait, Responder, ResponderError, ResponderInputs};
//!
//! struct SalesResponder;
//!
//! #[async_trait]
//! impl Responder for SalesResponder {
//!     async fn invoke(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
//!         let question = inputs.require_string("question")?;
//!         Ok(format!("Happy to help with pricing: {}", question))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "sales"
//!     }
//! }
//! ```

mod error;
mod history;
mod inputs;
mod prompt;
mod trait_def;

pub use error::ResponderError;
pub use history::{ChatRole, ChatTurn};
pub use inputs::ResponderInputs;
pub use prompt::{
    hash_prompt, load_classifier_prompt, DEFAULT_CLASSIFIER_PROMPT, DEFAULT_CLASSIFIER_PROMPT_FILE,
};
pub use trait_def::Responder;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
