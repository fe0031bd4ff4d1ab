//! The orchestration state machine.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use responder_core::{load_classifier_prompt, ChatTurn, Responder, ResponderError, ResponderInputs};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::{AdapterConfig, ResponderAdapter};
use crate::classifier::IntentClassifier;
use crate::config::OrchestratorConfig;
use crate::error::{FailureKind, OrchestratorError};
use crate::metrics::ResponderMetricsSnapshot;
use crate::observer::{StateSnapshot, TransitionObserver};
use crate::routing::RoutingTable;
use crate::state::{ExecutionRecord, ExecutionStatus, Phase, RequestState, ValidationRecord};
use crate::validator;

/// Reply sent when the request itself is rejected.
pub const VALIDATION_ERROR_RESPONSE: &str =
    "Sorry, I couldn't process that request. Please check your message and try again.";

/// Reply sent when no responder produced a usable answer.
pub const GENERIC_FAILURE_RESPONSE: &str =
    "Sorry, I'm having trouble answering right now. A member of our team will follow up with you shortly.";

/// Resolved intent reported for rejected requests.
pub const INVALID_REQUEST_INTENT: &str = "invalid_request";

/// Escalations allowed per request.
pub const MAX_ESCALATIONS: u32 = 1;

/// How a run reached END.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    /// Input validation rejected the request.
    Rejected,
    /// The current `agent_response` passed output validation.
    Answered,
    /// Both responders failed, or the deadline passed first.
    Unanswered,
}

/// Final result of one run, with the full audit state.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub response: String,
    pub resolved_intent: String,
    pub session_id: Uuid,
    pub state: RequestState,
}

/// Drives classify → route → execute → validate → (escalate) → end.
///
/// The orchestrator itself is immutable after [`OrchestratorBuilder::build`]
/// and can be shared across tasks behind an `Arc`; each run owns its own
/// [`RequestState`].
pub struct Orchestrator {
    classifier: IntentClassifier,
    responders: HashMap<String, ResponderAdapter>,
    routing: RoutingTable,
    config: OrchestratorConfig,
    observer: Option<Arc<dyn TransitionObserver>>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Answer a question, returning `(response, resolved_intent)`.
    ///
    /// Always returns a non-empty response.
    pub async fn run(
        &self,
        question: &str,
        user_id: &str,
        company_id: &str,
        chat_history: Vec<ChatTurn>,
    ) -> (String, String) {
        let outcome = self
            .run_detailed(question, user_id, company_id, chat_history)
            .await;
        (outcome.response, outcome.resolved_intent)
    }

    /// Like [`run`](Self::run), but also returns the request state.
    pub async fn run_detailed(
        &self,
        question: &str,
        user_id: &str,
        company_id: &str,
        chat_history: Vec<ChatTurn>,
    ) -> RunOutcome {
        let state = RequestState::new(question, user_id, company_id, chat_history, MAX_ESCALATIONS);
        self.drive(state, None).await
    }

    /// Like [`run_detailed`](Self::run_detailed), stopping at the next state
    /// boundary once `deadline` has passed.
    pub async fn run_with_deadline(
        &self,
        question: &str,
        user_id: &str,
        company_id: &str,
        chat_history: Vec<ChatTurn>,
        deadline: Instant,
    ) -> RunOutcome {
        let state = RequestState::new(question, user_id, company_id, chat_history, MAX_ESCALATIONS);
        self.drive(state, Some(deadline)).await
    }

    /// Per-responder counters, classifier included.
    pub fn metrics(&self) -> BTreeMap<String, ResponderMetricsSnapshot> {
        let mut metrics: BTreeMap<String, ResponderMetricsSnapshot> = self
            .responders
            .iter()
            .map(|(name, adapter)| (name.clone(), adapter.metrics()))
            .collect();
        metrics.insert(self.classifier.name().to_string(), self.classifier.metrics());
        metrics
    }

    /// Readiness of every registered responder, classifier included.
    pub async fn readiness(&self) -> BTreeMap<String, bool> {
        let mut ready = BTreeMap::new();
        ready.insert(
            self.classifier.name().to_string(),
            self.classifier.is_ready().await,
        );
        for (name, adapter) in &self.responders {
            ready.insert(name.clone(), adapter.is_ready().await);
        }
        ready
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    async fn drive(&self, mut state: RequestState, deadline: Option<Instant>) -> RunOutcome {
        let session_id = Uuid::new_v4();
        let mut phase = Phase::Start;
        let mut target: Option<String> = None;
        let mut ending = Ending::Unanswered;

        info!(
            session_id = %session_id,
            company_id = %state.company_id,
            user_id = %state.user_id,
            "Processing request"
        );
        self.notify(session_id, phase, &state);

        while phase != Phase::End {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(session_id = %session_id, phase = %phase, "Deadline exceeded, ending run");
                state.record_error(
                    FailureKind::DeadlineExceeded,
                    format!("caller deadline passed before {}", phase),
                );
                phase = Phase::End;
                self.notify(session_id, phase, &state);
                break;
            }

            phase = match phase {
                Phase::Start => Phase::ValidatingInput,
                Phase::ValidatingInput => {
                    let next = self.validate_input(&mut state);
                    if next == Phase::End {
                        ending = Ending::Rejected;
                    }
                    next
                }
                Phase::Classifying => self.classify(&mut state).await,
                Phase::Routing => {
                    let responder = self.route(&mut state);
                    target = Some(responder);
                    Phase::ExecutingPrimary
                }
                Phase::ExecutingPrimary | Phase::ExecutingFallback => {
                    if let Some(responder) = target.as_deref() {
                        self.execute(&mut state, responder).await;
                    }
                    Phase::ValidatingOutput
                }
                Phase::ValidatingOutput => {
                    let next = self.validate_output(&mut state);
                    if !state.should_retry {
                        ending = Ending::Answered;
                    }
                    next
                }
                Phase::Escalating => {
                    target = Some(self.escalate(&mut state));
                    Phase::ExecutingFallback
                }
                Phase::End => Phase::End,
            };

            self.notify(session_id, phase, &state);
        }

        self.finish(session_id, state, ending)
    }

    fn validate_input(&self, state: &mut RequestState) -> Phase {
        let record = validator::validate_request(
            &state.question,
            &state.user_id,
            &state.company_id,
            &state.chat_history,
            &self.config.input_policy,
            self.config.is_known_company(&state.company_id),
        );

        for warning in &record.warnings {
            debug!("Input warning: {}", warning);
        }

        let valid = record.is_valid;
        if !valid {
            warn!("Rejecting request: {}", record.summary());
            state.record_error(FailureKind::InputValidation, record.summary());
        }
        state.record_validation(record);

        if valid {
            Phase::Classifying
        } else {
            Phase::End
        }
    }

    async fn classify(&self, state: &mut RequestState) -> Phase {
        let safe_default = self.routing.safe_default().intent.clone();
        let result = self
            .classifier
            .classify(&state.question, &state.chat_history, &safe_default)
            .await;

        if let Some(error) = &result.error {
            state.record_error(FailureKind::ClassificationFailed, error);
        }

        let classification = result.classification;
        info!(
            intent = %classification.intent,
            confidence = classification.confidence,
            fallback = result.error.is_some(),
            "Classified request"
        );

        state.intent = Some(classification.intent);
        state.confidence = classification.confidence;
        state.keywords = classification.keywords;
        state.classification_execution = Some(result.execution);
        Phase::Routing
    }

    fn route(&self, state: &mut RequestState) -> String {
        let intent = state.intent.as_deref().unwrap_or_default();
        let threshold = self.config.routing_threshold_for(&state.company_id);
        let decision = self.routing.resolve(intent, state.confidence, threshold);

        if decision.degraded {
            info!(
                "Routing {} (confidence {:.2}, threshold {:.2}) to safe default {}",
                intent, state.confidence, threshold, decision.responder
            );
        } else {
            info!("Routing {} to {}", intent, decision.responder);
        }

        state.current_agent = Some(decision.responder.clone());
        decision.responder
    }

    async fn execute(&self, state: &mut RequestState, responder: &str) {
        let record = match self.responders.get(responder) {
            Some(adapter) => {
                let outcome = adapter.invoke(self.responder_inputs(state)).await;
                if let Some(error) = &outcome.error {
                    state.record_error(failure_kind(error), format!("{}: {}", responder, error));
                }
                outcome.execution
            }
            None => {
                let error = format!("{}: responder is not registered", responder);
                state.record_error(FailureKind::ResponderInvocation, &error);
                ExecutionRecord {
                    agent_name: responder.to_string(),
                    status: ExecutionStatus::Failed,
                    duration_ms: 0,
                    retries: 0,
                    output: None,
                    error: Some(error),
                    started_at: Utc::now(),
                }
            }
        };

        state.record_execution(record);
    }

    fn responder_inputs(&self, state: &RequestState) -> ResponderInputs {
        let keywords: Vec<Value> = state.keywords.iter().cloned().map(Value::from).collect();
        ResponderInputs::for_question(state.question.clone(), &state.chat_history)
            .with("user_id", state.user_id.clone())
            .with("company_id", state.company_id.clone())
            .with("intent", state.intent.clone().unwrap_or_default())
            .with("confidence", state.confidence)
            .with("keywords", keywords)
            .with("escalated", state.retries > 0)
    }

    fn validate_output(&self, state: &mut RequestState) -> Phase {
        let record = match state.last_execution() {
            Some(execution) if execution.succeeded() => validator::validate_output(
                state.agent_response.as_deref().unwrap_or_default(),
                self.config.min_response_chars,
            ),
            Some(execution) => {
                let mut record = ValidationRecord::invalid(format!(
                    "{} failed: {}",
                    execution.agent_name,
                    execution.error.as_deref().unwrap_or("unknown error")
                ));
                record.meta("stage", "output");
                record
            }
            None => ValidationRecord::invalid("no responder was executed"),
        };

        let valid = record.is_valid;
        if !valid && state.last_execution().is_some_and(ExecutionRecord::succeeded) {
            state.record_error(FailureKind::OutputValidation, record.summary());
        }
        state.should_retry = !valid;
        state.record_validation(record);

        if valid {
            return Phase::End;
        }

        if state.retries == 0 && state.can_escalate() {
            Phase::Escalating
        } else {
            warn!("Fallback responder failed, returning generic failure");
            state.record_error(
                FailureKind::EscalationExhausted,
                "primary and fallback responders both failed",
            );
            Phase::End
        }
    }

    fn escalate(&self, state: &mut RequestState) -> String {
        let primary = state.current_agent.clone().unwrap_or_default();
        let target = self.routing.escalation_target(&primary).clone();

        state.retries += 1;
        state.intent = Some(target.intent);
        warn!("Escalating from {} to {}", primary, target.responder);
        target.responder
    }

    /// Assemble the reply. Only output that passed validation is ever returned;
    /// a deadline that cuts a run short yields the generic failure text even
    /// when a responder already produced an unvalidated answer.
    fn finish(&self, session_id: Uuid, mut state: RequestState, ending: Ending) -> RunOutcome {
        state.completed_at = Some(Utc::now());

        let response = match (ending, &state.agent_response) {
            (Ending::Rejected, _) => VALIDATION_ERROR_RESPONSE.to_string(),
            (Ending::Answered, Some(text)) => text.clone(),
            _ => GENERIC_FAILURE_RESPONSE.to_string(),
        };

        let resolved_intent = if ending == Ending::Rejected {
            INVALID_REQUEST_INTENT.to_string()
        } else {
            state
                .current_agent
                .clone()
                .unwrap_or_else(|| self.routing.safe_default().responder.clone())
        };

        info!(
            session_id = %session_id,
            resolved_intent = %resolved_intent,
            executions = state.executions.len(),
            retries = state.retries,
            errors = state.errors.len(),
            "Request complete"
        );

        RunOutcome {
            response,
            resolved_intent,
            session_id,
            state,
        }
    }

    fn notify(&self, session_id: Uuid, phase: Phase, state: &RequestState) {
        let Some(observer) = &self.observer else {
            return;
        };

        let snapshot = StateSnapshot {
            session_id,
            phase,
            recorded_at: Utc::now(),
            state: state.clone(),
        };
        if catch_unwind(AssertUnwindSafe(|| observer.on_transition(&snapshot))).is_err() {
            warn!(session_id = %session_id, phase = %phase, "Transition observer panicked");
        }
    }
}

fn failure_kind(error: &ResponderError) -> FailureKind {
    match error {
        ResponderError::Timeout(_) => FailureKind::ResponderTimeout,
        ResponderError::InvalidOutput(_) => FailureKind::OutputValidation,
        _ => FailureKind::ResponderInvocation,
    }
}

/// Assembles an [`Orchestrator`] from responders, routing and configuration.
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    routing: RoutingTable,
    classifier: Option<(Option<AdapterConfig>, Arc<dyn Responder>)>,
    classifier_prompt: Option<String>,
    responders: Vec<(Option<AdapterConfig>, Arc<dyn Responder>)>,
    observer: Option<Arc<dyn TransitionObserver>>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            routing: RoutingTable::clinic(),
            classifier: None,
            classifier_prompt: None,
            responders: Vec::new(),
            observer: None,
        }
    }
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    /// Register the classifier with adapter settings derived from the config.
    pub fn classifier(mut self, responder: Arc<dyn Responder>) -> Self {
        self.classifier = Some((None, responder));
        self
    }

    /// Register the classifier with explicit adapter settings.
    pub fn classifier_with(mut self, config: AdapterConfig, responder: Arc<dyn Responder>) -> Self {
        self.classifier = Some((Some(config), responder));
        self
    }

    /// Use this prompt instead of [`load_classifier_prompt`].
    pub fn classifier_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.classifier_prompt = Some(prompt.into());
        self
    }

    /// Register a responder under its own name with settings derived from the config.
    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responders.push((None, responder));
        self
    }

    /// Register a responder under `config.name` with explicit adapter settings.
    pub fn responder_with(mut self, config: AdapterConfig, responder: Arc<dyn Responder>) -> Self {
        self.responders.push((Some(config), responder));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn TransitionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        self.config.validate()?;
        self.routing.validate()?;

        let pool = Arc::new(Semaphore::new(self.config.worker_pool_size));

        let (classifier_config, classifier_responder) = self.classifier.ok_or_else(|| {
            OrchestratorError::InvalidConfig("no classifier registered".to_string())
        })?;
        let classifier_config = classifier_config
            .unwrap_or_else(|| self.config.classifier_adapter(classifier_responder.name()));
        let prompt = self.classifier_prompt.unwrap_or_else(load_classifier_prompt);
        let classifier_adapter = ResponderAdapter::new(classifier_config, classifier_responder)
            .with_input_validator(validator::question_required())
            .with_output_validator(Arc::new(crate::classifier::validate_classification))
            .with_pool(pool.clone());
        let classifier = IntentClassifier::from_adapter(classifier_adapter, prompt);

        let mut responders = HashMap::new();
        for (adapter_config, responder) in self.responders {
            let adapter_config =
                adapter_config.unwrap_or_else(|| self.config.responder_adapter(responder.name()));
            let name = adapter_config.name.clone();
            let adapter = ResponderAdapter::new(adapter_config, responder)
                .with_input_validator(validator::question_required())
                .with_output_validator(validator::min_length(self.config.min_response_chars))
                .with_pool(pool.clone());
            if responders.insert(name.clone(), adapter).is_some() {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "responder {} registered twice",
                    name
                )));
            }
        }

        for name in self.routing.responders() {
            if !responders.contains_key(name) {
                return Err(OrchestratorError::UnknownResponder(name.to_string()));
            }
        }

        info!(
            "Orchestrator ready with {} responders (pool size {})",
            responders.len(),
            self.config.worker_pool_size
        );

        Ok(Orchestrator {
            classifier,
            responders,
            routing: self.routing,
            config: self.config,
            observer: self.observer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_responder::{ScriptedClassifier, StaticResponder};

    fn minimal_builder() -> OrchestratorBuilder {
        let routing = RoutingTable::new(
            crate::routing::RouteTarget::new("general", "front_desk"),
            crate::routing::RouteTarget::new("support", "care_team"),
        );
        Orchestrator::builder()
            .routing(routing)
            .classifier(Arc::new(ScriptedClassifier::fixed("support", 0.9)))
            .classifier_prompt("Classify.")
            .responder(Arc::new(StaticResponder::new(
                "front_desk",
                "Thanks for reaching out to the clinic!",
            )))
    }

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            failure_kind(&ResponderError::Timeout(100)),
            FailureKind::ResponderTimeout
        );
        assert_eq!(
            failure_kind(&ResponderError::InvalidOutput("too short".to_string())),
            FailureKind::OutputValidation
        );
        assert_eq!(
            failure_kind(&ResponderError::Panicked("boom".to_string())),
            FailureKind::ResponderInvocation
        );
    }

    #[test]
    fn test_build_requires_routed_responders() {
        let err = minimal_builder().build().err().unwrap();
        assert!(matches!(err, OrchestratorError::UnknownResponder(name) if name == "care_team"));
    }

    #[tokio::test]
    async fn test_custom_routing_table() {
        let orchestrator = minimal_builder()
            .responder_with(
                AdapterConfig::new("care_team").with_timeout_ms(500),
                Arc::new(StaticResponder::new(
                    "care_team",
                    "A nurse will call you back within the hour.",
                )),
            )
            .build()
            .unwrap();

        let (response, resolved) = orchestrator
            .run("My lip is still swollen", "user-1", "clinic-1", Vec::new())
            .await;

        assert_eq!(response, "A nurse will call you back within the hour.");
        assert_eq!(resolved, "care_team");
        assert_eq!(orchestrator.classifier().prompt_hash().len(), 64);
    }
}
