//! Deterministic intent → responder routing.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Intent labels understood by the default clinic routing table.
pub mod intents {
    pub const SALES: &str = "sales";
    pub const EMERGENCY: &str = "emergency";
    pub const SUPPORT: &str = "support";
    pub const SCHEDULING: &str = "scheduling";
    pub const GENERAL: &str = "general";
}

/// Default confidence below which routing degrades to the safe default.
pub const DEFAULT_ROUTING_THRESHOLD: f64 = 0.7;

/// An intent label paired with the responder that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub intent: String,
    pub responder: String,
}

impl RouteTarget {
    pub fn new(intent: impl Into<String>, responder: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            responder: responder.into(),
        }
    }
}

/// Result of routing one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub responder: String,
    /// True when low confidence or an unknown intent forced the safe default.
    pub degraded: bool,
}

/// Fixed routing table shared read-only by all runs.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<String, String>,
    safe_default: RouteTarget,
    fallback: RouteTarget,
}

impl RoutingTable {
    /// Create an empty table with its safe-default and fallback targets.
    ///
    /// Both targets are also registered as routes for their own intents.
    pub fn new(mut safe_default: RouteTarget, mut fallback: RouteTarget) -> Self {
        safe_default.intent = safe_default.intent.to_lowercase();
        fallback.intent = fallback.intent.to_lowercase();

        let mut routes = HashMap::new();
        routes.insert(safe_default.intent.clone(), safe_default.responder.clone());
        routes.insert(fallback.intent.clone(), fallback.responder.clone());
        Self {
            routes,
            safe_default,
            fallback,
        }
    }

    /// Route `intent` to `responder`.
    pub fn route(mut self, intent: impl Into<String>, responder: impl Into<String>) -> Self {
        self.routes
            .insert(intent.into().to_lowercase(), responder.into());
        self
    }

    /// The clinic table: one responder per intent, `general` as the safe
    /// default and `support` as the escalation fallback.
    pub fn clinic() -> Self {
        Self::new(
            RouteTarget::new(intents::GENERAL, intents::GENERAL),
            RouteTarget::new(intents::SUPPORT, intents::SUPPORT),
        )
        .route(intents::SALES, intents::SALES)
        .route(intents::EMERGENCY, intents::EMERGENCY)
        .route(intents::SCHEDULING, intents::SCHEDULING)
    }

    pub fn safe_default(&self) -> &RouteTarget {
        &self.safe_default
    }

    pub fn fallback(&self) -> &RouteTarget {
        &self.fallback
    }

    /// Pick the responder for a classification.
    ///
    /// Confidence under `threshold` always yields the safe default, never
    /// another intent's responder. Unknown intents do the same.
    pub fn resolve(&self, intent: &str, confidence: f64, threshold: f64) -> RouteDecision {
        if confidence.is_nan() || confidence < threshold {
            return RouteDecision {
                responder: self.safe_default.responder.clone(),
                degraded: true,
            };
        }

        match self.routes.get(intent) {
            Some(responder) => RouteDecision {
                responder: responder.clone(),
                degraded: false,
            },
            None => RouteDecision {
                responder: self.safe_default.responder.clone(),
                degraded: true,
            },
        }
    }

    /// Where to escalate after `primary` failed.
    ///
    /// Always a different responder: the fallback, or the safe default when
    /// the primary is the fallback itself.
    pub fn escalation_target(&self, primary: &str) -> &RouteTarget {
        if primary == self.fallback.responder {
            &self.safe_default
        } else {
            &self.fallback
        }
    }

    /// Every responder name the table can select, sorted.
    pub fn responders(&self) -> BTreeSet<&str> {
        self.routes.values().map(String::as_str).collect()
    }

    /// Reject tables where escalation could land on the failing responder.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.fallback.responder == self.safe_default.responder {
            return Err(OrchestratorError::InvalidConfig(format!(
                "fallback responder {} must differ from the safe default",
                self.fallback.responder
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_routes_by_intent() {
        let table = RoutingTable::clinic();
        let decision = table.resolve(intents::SALES, 0.95, DEFAULT_ROUTING_THRESHOLD);
        assert_eq!(decision.responder, "sales");
        assert!(!decision.degraded);

        let decision = table.resolve(intents::EMERGENCY, 0.7, DEFAULT_ROUTING_THRESHOLD);
        assert_eq!(decision.responder, "emergency");
    }

    #[test]
    fn test_low_confidence_degrades_to_safe_default() {
        let table = RoutingTable::clinic();
        let decision = table.resolve(intents::EMERGENCY, 0.69, DEFAULT_ROUTING_THRESHOLD);
        assert_eq!(decision.responder, "general");
        assert!(decision.degraded);

        let decision = table.resolve(intents::SALES, f64::NAN, DEFAULT_ROUTING_THRESHOLD);
        assert_eq!(decision.responder, "general");
    }

    #[test]
    fn test_unknown_intent_degrades() {
        let table = RoutingTable::clinic();
        let decision = table.resolve("astrology", 0.99, DEFAULT_ROUTING_THRESHOLD);
        assert_eq!(decision.responder, "general");
        assert!(decision.degraded);
    }

    #[test]
    fn test_escalation_target_differs_from_primary() {
        let table = RoutingTable::clinic();
        assert_eq!(table.escalation_target("emergency").responder, "support");
        assert_eq!(table.escalation_target("general").responder, "support");
        assert_eq!(table.escalation_target("support").responder, "general");
    }

    #[test]
    fn test_custom_route_lowercases_intent() {
        let table = RoutingTable::clinic().route("Billing", "support");
        assert_eq!(table.resolve("billing", 0.9, 0.7).responder, "support");
    }

    #[test]
    fn test_new_lowercases_target_intents() {
        let table = RoutingTable::new(
            RouteTarget::new("General", "front_desk"),
            RouteTarget::new("Support", "care_team"),
        );
        assert_eq!(table.resolve("support", 0.9, 0.7).responder, "care_team");
        assert_eq!(table.resolve("general", 0.9, 0.7).responder, "front_desk");
        assert_eq!(table.escalation_target("front_desk").intent, "support");
    }

    #[test]
    fn test_responders_listed() {
        let table = RoutingTable::clinic();
        let names: Vec<&str> = table.responders().into_iter().collect();
        assert_eq!(names, vec!["emergency", "general", "sales", "scheduling", "support"]);
    }

    #[test]
    fn test_validate_rejects_same_fallback() {
        let table = RoutingTable::new(
            RouteTarget::new("general", "general"),
            RouteTarget::new("support", "general"),
        );
        assert!(table.validate().is_err());
        assert!(RoutingTable::clinic().validate().is_ok());
    }
}
