//! Per-responder invocation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters shared by every run that uses one responder.
#[derive(Debug, Default)]
pub struct ResponderMetrics {
    invocations: AtomicU64,
    errors: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Point-in-time view of a responder's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponderMetricsSnapshot {
    pub invocations: u64,
    pub errors: u64,
    pub avg_duration_ms: f64,
}

impl ResponderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt against the responder.
    pub fn record_attempt(&self, duration_ms: u64, failed: bool) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count an error that did not come from an attempt (rejected input, bad output).
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ResponderMetricsSnapshot {
        let invocations = self.invocations.load(Ordering::Relaxed);
        let total = self.total_duration_ms.load(Ordering::Relaxed);
        let avg_duration_ms = if invocations == 0 {
            0.0
        } else {
            total as f64 / invocations as f64
        };

        ResponderMetricsSnapshot {
            invocations,
            errors: self.errors.load(Ordering::Relaxed),
            avg_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let metrics = ResponderMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.invocations, 0);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.avg_duration_ms, 0.0);
    }

    #[test]
    fn test_average_duration() {
        let metrics = ResponderMetrics::new();
        metrics.record_attempt(100, false);
        metrics.record_attempt(300, true);
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.invocations, 2);
        assert_eq!(snapshot.errors, 2);
        assert_eq!(snapshot.avg_duration_ms, 200.0);
    }

    #[tokio::test]
    async fn test_concurrent_updates() {
        let metrics = Arc::new(ResponderMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = metrics.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    metrics.record_attempt(1, false);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(metrics.snapshot().invocations, 800);
    }
}
