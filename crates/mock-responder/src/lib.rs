//! Mock responder implementations for orchestrator testing.
//!
//! This crate provides deterministic implementations of the `Responder` trait:
//! - `StaticResponder` - Always returns the same reply
//! - `EchoResponder` - Echoes the question back with a prefix
//! - `FailingResponder` - Always fails with a given error
//! - `PanickingResponder` - Panics on every invocation
//! - `FlakyResponder` - Fails a fixed number of times, then delegates
//! - `DelayedResponder` - Wraps another responder with artificial delay
//! - `ScriptedClassifier` - Emits classifier JSON from keyword rules
//!
//! # Example
//!
//! ```rust
//! use mock_responder::{Responder, ResponderInputs, StaticResponder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_responder::ResponderError> {
//!     let responder = StaticResponder::new("sales", "Botox starts at $300 per area.");
//!
//!     let reply = responder.invoke(ResponderInputs::for_question("price?", &[])).await?;
//!     assert_eq!(reply, "Botox starts at $300 per area.");
//!     Ok(())
//! }
//! ```

mod classifier;
mod delayed;
mod echo;
mod failing;

// Re-export responder-core types for convenience
pub use responder_core::{async_trait, ChatTurn, Responder, ResponderError, ResponderInputs};

pub use classifier::ScriptedClassifier;
pub use delayed::DelayedResponder;
pub use echo::{EchoResponder, StaticResponder};
pub use failing::{FailingResponder, FlakyResponder, PanickingResponder};
