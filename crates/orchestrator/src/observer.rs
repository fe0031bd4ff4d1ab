//! Observational hooks invoked after every state transition.
//!
//! Observers receive a snapshot of the request state and must return
//! immediately; they cannot influence the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::{Phase, RequestState};

/// Copy of a run's state at the moment it entered `phase`.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub recorded_at: DateTime<Utc>,
    pub state: RequestState,
}

/// Receives state snapshots; implementations must not block.
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, snapshot: &StateSnapshot);
}

/// Forwards snapshots to a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<StateSnapshot>,
}

impl ChannelObserver {
    /// Create an observer and the receiver a consumer drains snapshots from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<StateSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TransitionObserver for ChannelObserver {
    fn on_transition(&self, snapshot: &StateSnapshot) {
        if let Err(err) = self.tx.try_send(snapshot.clone()) {
            warn!(
                session_id = %snapshot.session_id,
                phase = %snapshot.phase,
                "Dropping state snapshot: {}",
                err
            );
        }
    }
}

/// Logs one line per transition.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl TransitionObserver for TracingObserver {
    fn on_transition(&self, snapshot: &StateSnapshot) {
        let state = &snapshot.state;
        debug!(
            session_id = %snapshot.session_id,
            phase = %snapshot.phase,
            intent = ?state.intent,
            confidence = state.confidence,
            current_agent = ?state.current_agent,
            executions = state.executions.len(),
            retries = state.retries,
            "STATE_TRANSITION"
        );
    }
}
