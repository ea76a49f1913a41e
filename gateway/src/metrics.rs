//! Request counters for the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Gateway metrics.
#[derive(Default)]
pub struct Metrics {
    /// Exchange rate lookups served.
    pub rate_requests: AtomicU64,
    /// Offramp quotes computed.
    pub quotes_issued: AtomicU64,
    /// Offramp requests created.
    pub offramps_created: AtomicU64,
    /// Admin patches applied.
    pub offramp_updates: AtomicU64,
    /// Patches refused by the transition guard.
    pub transitions_rejected: AtomicU64,
    /// Patches that lost a concurrent update.
    pub update_conflicts: AtomicU64,
    /// Admin requests without an allowed e-mail.
    pub admin_denied: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate_requested(&self) {
        self.rate_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn quote_issued(&self) {
        self.quotes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn offramp_created(&self) {
        self.offramps_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn offramp_updated(&self) {
        self.offramp_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transition_rejected(&self) {
        self.transitions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_conflict(&self) {
        self.update_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn admin_rejected(&self) {
        self.admin_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rate_requests: self.rate_requests.load(Ordering::Relaxed),
            quotes_issued: self.quotes_issued.load(Ordering::Relaxed),
            offramps_created: self.offramps_created.load(Ordering::Relaxed),
            offramp_updates: self.offramp_updates.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            update_conflicts: self.update_conflicts.load(Ordering::Relaxed),
            admin_denied: self.admin_denied.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub rate_requests: u64,
    pub quotes_issued: u64,
    pub offramps_created: u64,
    pub offramp_updates: u64,
    pub transitions_rejected: u64,
    pub update_conflicts: u64,
    pub admin_denied: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.rate_requested();
        metrics.rate_requested();
        metrics.quote_issued();
        metrics.update_conflict();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rate_requests, 2);
        assert_eq!(snapshot.quotes_issued, 1);
        assert_eq!(snapshot.update_conflicts, 1);
        assert_eq!(snapshot.offramp_updates, 0);
    }
}
