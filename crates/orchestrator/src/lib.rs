//! Multi-responder orchestration engine.
//!
//! This crate provides the [`Orchestrator`] type, a state machine that takes a
//! user question and drives it through classification, routing, execution and
//! validation, escalating once to a fallback responder when the primary fails.
//!
//! # Features
//!
//! - Uniform invocation of heterogeneous [`Responder`]s with timeouts,
//!   bounded retries, panic containment and per-responder metrics
//! - Intent classification that never fails a request (safe default on error)
//! - Confidence-gated routing with per-company thresholds
//! - One bounded escalation, and a full audit trail in [`RequestState`]
//! - Optional transition snapshots through a [`TransitionObserver`]
//!
//! # Architecture
//!
//! ```text
//! question, user_id, company_id, history
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Validate input ──── invalid ───────────────────┐        │
//! │         ↓                                          │        │
//! │  2. Classify intent (safe default on failure)      │        │
//! │         ↓                                          │        │
//! │  3. Route (low confidence → safe default)          │        │
//! │         ↓                                          │        │
//! │  4. Execute primary responder                      │        │
//! │         ↓                                          │        │
//! │  5. Validate output ─── ok ────────────────────────┤        │
//! │         ↓ failed                                   │        │
//! │  6. Escalate once → execute fallback → validate ───┤        │
//! │                                                    ↓        │
//! │                                                   END       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{Orchestrator, OrchestratorConfig, RoutingTable};
//!
//! let orchestrator = Orchestrator::builder()
//!     .config(OrchestratorConfig::from_env()?)
//!     .routing(RoutingTable::clinic())
//!     .classifier(Arc::new(my_classifier))
//!     .responder(Arc::new(sales))
//!     .responder(Arc::new(emergency))
//!     .responder(Arc::new(support))
//!     .responder(Arc::new(scheduling))
//!     .responder(Arc::new(general))
//!     .build()?;
//!
//! let (response, resolved) = orchestrator
//!     .run("How much is Botox?", "user-1", "clinic-1", Vec::new())
//!     .await;
//! ```

mod adapter;
mod classifier;
mod config;
mod error;
mod metrics;
mod observer;
mod orchestrator;
mod routing;
mod state;
mod validator;

// Public exports
pub use adapter::{
    AdapterConfig, InvocationOutcome, ResponderAdapter, DEFAULT_CLASSIFIER_TIMEOUT,
    DEFAULT_MAX_RETRIES, DEFAULT_RESPONDER_TIMEOUT,
};
pub use classifier::{
    parse_classification, validate_classification, Classification, ClassificationResult,
    IntentClassifier,
};
pub use config::{load_company_settings, CompanySettings, OrchestratorConfig, DEFAULT_WORKER_POOL_SIZE};
pub use error::{FailureKind, OrchestratorError};
pub use metrics::{ResponderMetrics, ResponderMetricsSnapshot};
pub use observer::{ChannelObserver, StateSnapshot, TracingObserver, TransitionObserver};
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, RunOutcome, GENERIC_FAILURE_RESPONSE,
    INVALID_REQUEST_INTENT, MAX_ESCALATIONS, VALIDATION_ERROR_RESPONSE,
};
pub use routing::{intents, RouteDecision, RouteTarget, RoutingTable, DEFAULT_ROUTING_THRESHOLD};
pub use state::{ExecutionRecord, ExecutionStatus, Phase, RequestState, ValidationRecord};
pub use validator::{
    min_length, question_required, require_question, validate_output, validate_request,
    InputPolicy, InputValidator, OutputValidator, DEFAULT_MIN_RESPONSE_CHARS, MAX_ID_CHARS,
};

// Re-export commonly used types from dependencies
pub use responder_core::{ChatRole, ChatTurn, Responder, ResponderError, ResponderInputs};
