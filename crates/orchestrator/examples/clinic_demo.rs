//! Clinic front-desk demo.
//!
//! Runs a handful of patient messages through the orchestrator using mock
//! responders, including an emergency responder that always times out.
//!
//! Run with: cargo run -p orchestrator --example clinic_demo
//!
//! Configuration via .env file or environment variables:
//!   ORCH_*              - Orchestrator settings (see `OrchestratorConfig::from_env`)
//!   CLASSIFIER_SYSTEM_PROMPT / CLASSIFIER_PROMPT_FILE - Classifier prompt
//!   LOG_FORMAT          - `json` for JSON log lines (default: text)

use std::env;
use std::sync::Arc;
use std::time::Duration;

use mock_responder::{DelayedResponder, ScriptedClassifier, StaticResponder};
use orchestrator::{ChatTurn, Orchestrator, OrchestratorConfig, RoutingTable, TracingObserver};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("orchestrator=debug".parse()?)
        .add_directive("clinic_demo=info".parse()?);
    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = OrchestratorConfig::from_env()?;
    config.responder_timeout = config.responder_timeout.min(Duration::from_millis(500));

    let classifier = ScriptedClassifier::fixed("general", 0.8)
        .rule("botox", "sales", 0.95)
        .rule("filler", "sales", 0.9)
        .rule("bleeding", "emergency", 0.98)
        .rule("swelling", "emergency", 0.85)
        .rule("appointment", "scheduling", 0.92)
        .rule("refund", "support", 0.88)
        .rule("maybe", "sales", 0.4);

    // Always slower than the responder timeout, so emergencies escalate.
    let emergency = DelayedResponder::new(
        Arc::new(StaticResponder::new(
            "emergency",
            "Please call 911 or go to the nearest emergency room right away.",
        )),
        Duration::from_secs(5),
    );

    let orchestrator = Orchestrator::builder()
        .config(config)
        .routing(RoutingTable::clinic())
        .classifier(Arc::new(classifier))
        .responder(Arc::new(StaticResponder::new(
            "sales",
            "Botox starts at $300 per treatment area, and fillers at $650 per syringe.",
        )))
        .responder(Arc::new(emergency))
        .responder(Arc::new(StaticResponder::new(
            "support",
            "I've flagged this for our care team and someone will call you shortly.",
        )))
        .responder(Arc::new(StaticResponder::new(
            "scheduling",
            "We have openings Tuesday at 10am and Thursday at 2pm. Which works best?",
        )))
        .responder(Arc::new(StaticResponder::new(
            "general",
            "Thanks for reaching out! Could you tell us a little more about what you need?",
        )))
        .observer(Arc::new(TracingObserver))
        .build()?;

    let history = vec![
        ChatTurn::user("Hi, I had filler done last week."),
        ChatTurn::assistant("Thanks for letting us know! How are you feeling?"),
    ];

    let messages = [
        "How much is Botox?",
        "I'm bleeding where the filler went in",
        "Can I book an appointment for next week?",
        "Maybe I want something done?",
        "",
    ];

    for message in messages {
        let outcome = orchestrator
            .run_detailed(message, "patient-42", "glow-clinic", history.clone())
            .await;

        info!(
            question = %message,
            resolved_intent = %outcome.resolved_intent,
            executions = outcome.state.executions.len(),
            escalations = outcome.state.retries,
            "Reply: {}",
            outcome.response
        );
        for error in &outcome.state.errors {
            info!("  error: {}", error);
        }
    }

    for (name, metrics) in orchestrator.metrics() {
        info!(
            responder = %name,
            invocations = metrics.invocations,
            errors = metrics.errors,
            avg_duration_ms = metrics.avg_duration_ms,
            "Metrics"
        );
    }

    Ok(())
}
