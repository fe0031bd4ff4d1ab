//! Uniform invocation wrapper around a single responder.
//!
//! The adapter owns everything that can go wrong around a responder call:
//! input checks, the per-attempt deadline, retry with exponential backoff,
//! panic containment, output checks, logging and metrics. Callers only ever
//! see an [`InvocationOutcome`].

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use responder_core::{Responder, ResponderError, ResponderInputs};
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::metrics::{ResponderMetrics, ResponderMetricsSnapshot};
use crate::state::{ExecutionRecord, ExecutionStatus};
use crate::validator::{self, InputValidator, OutputValidator, DEFAULT_MIN_RESPONSE_CHARS};

/// Default deadline for content responders.
pub const DEFAULT_RESPONDER_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default deadline for the intent classifier.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(200);
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(2_000);

/// Per-responder settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub name: String,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Retries after the first attempt, for retryable errors only.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl AdapterConfig {
    /// Settings for a content responder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_RESPONDER_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }

    /// Settings for the fast classification path.
    pub fn classifier(name: impl Into<String>) -> Self {
        Self {
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            ..Self::new(name)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, millis: u64) -> Self {
        self.with_timeout(Duration::from_millis(millis))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << retry.min(16))
            .min(self.backoff_max)
    }
}

/// Structured result of one adapter invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<ResponderError>,
    pub execution: ExecutionRecord,
}

/// Wraps a responder behind the uniform invocation contract.
pub struct ResponderAdapter {
    config: AdapterConfig,
    responder: Arc<dyn Responder>,
    input_validator: Option<InputValidator>,
    output_validator: OutputValidator,
    metrics: Arc<ResponderMetrics>,
    pool: Option<Arc<Semaphore>>,
}

impl ResponderAdapter {
    /// Create an adapter with the default output check (non-empty, minimum length).
    pub fn new(config: AdapterConfig, responder: Arc<dyn Responder>) -> Self {
        Self {
            config,
            responder,
            input_validator: None,
            output_validator: validator::min_length(DEFAULT_MIN_RESPONSE_CHARS),
            metrics: Arc::new(ResponderMetrics::new()),
            pool: None,
        }
    }

    pub fn with_input_validator(mut self, validator: InputValidator) -> Self {
        self.input_validator = Some(validator);
        self
    }

    pub fn with_output_validator(mut self, validator: OutputValidator) -> Self {
        self.output_validator = validator;
        self
    }

    /// Gate every attempt on a permit from a shared worker pool.
    pub fn with_pool(mut self, pool: Arc<Semaphore>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn metrics(&self) -> ResponderMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn is_ready(&self) -> bool {
        self.responder.is_ready().await
    }

    /// Invoke the responder. Never panics and never returns an error.
    pub async fn invoke(&self, inputs: ResponderInputs) -> InvocationOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        let name = self.config.name.as_str();

        if let Some(check) = &self.input_validator {
            let record = check(&inputs);
            if !record.is_valid {
                self.metrics.record_error();
                warn!(responder = %name, errors = %record.summary(), "RESPONDER_INPUT_REJECTED");
                return self.failed(
                    ResponderError::InvalidInput(record.summary()),
                    0,
                    start,
                    started_at,
                );
            }
        }

        let mut retries = 0u32;
        loop {
            let attempt = retries + 1;
            debug!(responder = %name, attempt, "RESPONDER_ATTEMPT_START");

            let attempt_start = Instant::now();
            let result = self.attempt(inputs.clone()).await;
            let attempt_ms = elapsed_ms(attempt_start);

            match result {
                Ok(output) => {
                    self.metrics.record_attempt(attempt_ms, false);

                    let record = (self.output_validator)(&output);
                    if !record.is_valid {
                        self.metrics.record_error();
                        warn!(
                            responder = %name,
                            attempt,
                            errors = %record.summary(),
                            "RESPONDER_OUTPUT_REJECTED"
                        );
                        return self.failed(
                            ResponderError::InvalidOutput(record.summary()),
                            retries,
                            start,
                            started_at,
                        );
                    }

                    let duration_ms = elapsed_ms(start);
                    info!(
                        responder = %name,
                        attempt,
                        duration_ms,
                        output_chars = output.chars().count(),
                        "RESPONDER_SUCCEEDED"
                    );
                    return InvocationOutcome {
                        success: true,
                        output: Some(output.clone()),
                        error: None,
                        execution: ExecutionRecord {
                            agent_name: self.config.name.clone(),
                            status: ExecutionStatus::Success,
                            duration_ms,
                            retries,
                            output: Some(output),
                            error: None,
                            started_at,
                        },
                    };
                }
                Err(err) => {
                    self.metrics.record_attempt(attempt_ms, true);
                    warn!(
                        responder = %name,
                        attempt,
                        duration_ms = attempt_ms,
                        error = %err,
                        "RESPONDER_ATTEMPT_FAILED"
                    );

                    if !err.is_retryable() || retries >= self.config.max_retries {
                        return self.failed(err, retries, start, started_at);
                    }

                    let backoff = self.config.backoff_for(retries);
                    debug!(responder = %name, backoff_ms = backoff.as_millis() as u64, "RESPONDER_BACKOFF");
                    sleep(backoff).await;
                    retries += 1;
                }
            }
        }
    }

    /// Run one attempt on its own task, bounded by the configured deadline.
    async fn attempt(&self, inputs: ResponderInputs) -> Result<String, ResponderError> {
        let responder = self.responder.clone();
        let pool = self.pool.clone();

        let mut handle = tokio::spawn(async move {
            let _permit = match pool {
                Some(pool) => Some(pool.acquire_owned().await.map_err(|_| {
                    ResponderError::Unavailable("worker pool closed".to_string())
                })?),
                None => None,
            };
            responder.invoke(inputs).await
        });

        match timeout(self.config.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(ResponderError::Panicked(panic_message(join_err.into_panic())))
            }
            Ok(Err(_)) => Err(ResponderError::InvocationFailed(
                "responder task was cancelled".to_string(),
            )),
            Err(_) => {
                handle.abort();
                Err(ResponderError::Timeout(self.config.timeout.as_millis() as u64))
            }
        }
    }

    fn failed(
        &self,
        error: ResponderError,
        retries: u32,
        start: Instant,
        started_at: chrono::DateTime<Utc>,
    ) -> InvocationOutcome {
        InvocationOutcome {
            success: false,
            output: None,
            execution: ExecutionRecord {
                agent_name: self.config.name.clone(),
                status: ExecutionStatus::Failed,
                duration_ms: elapsed_ms(start),
                retries,
                output: None,
                error: Some(error.to_string()),
                started_at,
            },
            error: Some(error),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
