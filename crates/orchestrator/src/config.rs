//! Orchestrator configuration.
//!
//! Values come from the environment (see [`OrchestratorConfig::from_env`])
//! with defaults for everything. Per-company overrides are read once from a
//! JSON file and shared read-only across concurrent runs.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::adapter::{
    AdapterConfig, DEFAULT_CLASSIFIER_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RESPONDER_TIMEOUT,
};
use crate::error::OrchestratorError;
use crate::routing::DEFAULT_ROUTING_THRESHOLD;
use crate::validator::{InputPolicy, DEFAULT_MIN_RESPONSE_CHARS};

/// Default number of concurrent responder invocations across all runs.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 32;

/// Read-only settings for one company.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanySettings {
    /// Overrides the global routing threshold.
    #[serde(default)]
    pub routing_threshold: Option<f64>,
}

/// Settings shared by every run of an orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub routing_threshold: f64,
    pub min_response_chars: usize,
    pub worker_pool_size: usize,
    pub classifier_timeout: Duration,
    pub responder_timeout: Duration,
    pub responder_max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub input_policy: InputPolicy,
    /// Reject companies without an entry in `companies`.
    pub strict_companies: bool,
    pub companies: HashMap<String, CompanySettings>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            routing_threshold: DEFAULT_ROUTING_THRESHOLD,
            min_response_chars: DEFAULT_MIN_RESPONSE_CHARS,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            responder_timeout: DEFAULT_RESPONDER_TIMEOUT,
            responder_max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_millis(2_000),
            input_policy: InputPolicy::default(),
            strict_companies: false,
            companies: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `ORCH_ROUTING_THRESHOLD` - Minimum confidence for intent routing (default: 0.7)
    /// - `ORCH_MIN_RESPONSE_CHARS` - Minimum reply length (default: 10)
    /// - `ORCH_WORKER_POOL_SIZE` - Concurrent responder invocations (default: 32)
    /// - `ORCH_CLASSIFIER_TIMEOUT_MS` - Classifier deadline per attempt (default: 10000)
    /// - `ORCH_RESPONDER_TIMEOUT_MS` - Responder deadline per attempt (default: 30000)
    /// - `ORCH_RESPONDER_MAX_RETRIES` - Retries after the first attempt (default: 2)
    /// - `ORCH_BACKOFF_BASE_MS` - First retry delay, doubled per retry (default: 200)
    /// - `ORCH_BACKOFF_MAX_MS` - Retry delay cap (default: 2000)
    /// - `ORCH_MAX_QUESTION_CHARS` - Longest accepted question (default: 4000)
    /// - `ORCH_STRICT_COMPANIES` - Reject unknown companies (default: false)
    /// - `ORCH_COMPANY_CONFIG_FILE` - JSON object of per-company settings
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let defaults = Self::default();

        let companies = match env::var("ORCH_COMPANY_CONFIG_FILE") {
            Ok(path) => {
                let companies = load_company_settings(&path)?;
                info!("Loaded settings for {} companies from {}", companies.len(), path);
                companies
            }
            Err(_) => HashMap::new(),
        };

        let config = Self {
            routing_threshold: env_parse("ORCH_ROUTING_THRESHOLD")
                .unwrap_or(defaults.routing_threshold),
            min_response_chars: env_parse("ORCH_MIN_RESPONSE_CHARS")
                .unwrap_or(defaults.min_response_chars),
            worker_pool_size: env_parse("ORCH_WORKER_POOL_SIZE")
                .unwrap_or(defaults.worker_pool_size),
            classifier_timeout: env_parse("ORCH_CLASSIFIER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.classifier_timeout),
            responder_timeout: env_parse("ORCH_RESPONDER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.responder_timeout),
            responder_max_retries: env_parse("ORCH_RESPONDER_MAX_RETRIES")
                .unwrap_or(defaults.responder_max_retries),
            backoff_base: env_parse("ORCH_BACKOFF_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
            backoff_max: env_parse("ORCH_BACKOFF_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_max),
            input_policy: InputPolicy {
                max_question_chars: env_parse("ORCH_MAX_QUESTION_CHARS")
                    .unwrap_or(defaults.input_policy.max_question_chars),
                ..defaults.input_policy
            },
            strict_companies: env::var("ORCH_STRICT_COMPANIES")
                .ok()
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            companies,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        check_threshold("routing_threshold", self.routing_threshold)?;
        for (company, settings) in &self.companies {
            if let Some(threshold) = settings.routing_threshold {
                check_threshold(&format!("routing_threshold for {}", company), threshold)?;
            }
        }
        if self.worker_pool_size == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        if self.min_response_chars == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "min_response_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_company(mut self, company_id: impl Into<String>, settings: CompanySettings) -> Self {
        self.companies.insert(company_id.into(), settings);
        self
    }

    /// Routing threshold for a company, falling back to the global value.
    pub fn routing_threshold_for(&self, company_id: &str) -> f64 {
        self.companies
            .get(company_id)
            .and_then(|s| s.routing_threshold)
            .unwrap_or(self.routing_threshold)
    }

    pub fn is_known_company(&self, company_id: &str) -> bool {
        !self.strict_companies || self.companies.contains_key(company_id)
    }

    /// Adapter settings for a content responder.
    pub fn responder_adapter(&self, name: impl Into<String>) -> AdapterConfig {
        AdapterConfig::new(name)
            .with_timeout(self.responder_timeout)
            .with_max_retries(self.responder_max_retries)
            .with_backoff(self.backoff_base, self.backoff_max)
    }

    /// Adapter settings for the classifier.
    pub fn classifier_adapter(&self, name: impl Into<String>) -> AdapterConfig {
        self.responder_adapter(name)
            .with_timeout(self.classifier_timeout)
            .with_max_retries(self.responder_max_retries.min(DEFAULT_MAX_RETRIES))
    }
}

/// Load a JSON object of `company_id -> CompanySettings`.
pub fn load_company_settings(
    path: impl AsRef<Path>,
) -> Result<HashMap<String, CompanySettings>, OrchestratorError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn check_threshold(field: &str, value: f64) -> Result<(), OrchestratorError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            field, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.routing_threshold, 0.7);
        assert_eq!(config.min_response_chars, 10);
        assert_eq!(config.classifier_timeout, Duration::from_millis(10_000));
        assert_eq!(config.responder_timeout, Duration::from_millis(30_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_company_threshold_override() {
        let config = OrchestratorConfig::default().with_company(
            "clinic-9",
            CompanySettings {
                routing_threshold: Some(0.9),
            },
        );
        assert_eq!(config.routing_threshold_for("clinic-9"), 0.9);
        assert_eq!(config.routing_threshold_for("clinic-1"), 0.7);
    }

    #[test]
    fn test_strict_companies() {
        let mut config =
            OrchestratorConfig::default().with_company("clinic-9", CompanySettings::default());
        assert!(config.is_known_company("clinic-404"));

        config.strict_companies = true;
        assert!(config.is_known_company("clinic-9"));
        assert!(!config.is_known_company("clinic-404"));
    }

    #[test]
    fn test_validate_ranges() {
        let config = OrchestratorConfig {
            routing_threshold: 1.5,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig::default().with_company(
            "clinic-9",
            CompanySettings {
                routing_threshold: Some(-0.1),
            },
        );
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            worker_pool_size: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_adapter_configs() {
        let config = OrchestratorConfig {
            responder_max_retries: 5,
            ..OrchestratorConfig::default()
        };
        let responder = config.responder_adapter("sales");
        assert_eq!(responder.name, "sales");
        assert_eq!(responder.max_retries, 5);
        assert_eq!(responder.timeout, Duration::from_millis(30_000));

        let classifier = config.classifier_adapter("intent_classifier");
        assert_eq!(classifier.timeout, Duration::from_millis(10_000));
        assert_eq!(classifier.max_retries, 2);
    }

    #[test]
    fn test_load_company_settings() {
        let path = std::env::temp_dir().join(format!(
            "orchestrator-companies-{}.json",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"clinic-9": {{"routing_threshold": 0.85}}, "clinic-2": {{}}}}"#
        )
        .unwrap();

        let companies = load_company_settings(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(companies.len(), 2);
        assert_eq!(companies["clinic-9"].routing_threshold, Some(0.85));
        assert_eq!(companies["clinic-2"].routing_threshold, None);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_company_settings("/nonexistent/companies.json");
        assert!(matches!(result, Err(OrchestratorError::Io(_))));
    }
}
