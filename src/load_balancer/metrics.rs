//! Routing metrics shared by every strategy and the health checker.
//!
//! Scalars are atomics; the per-backend tally is a concurrent map whose
//! entries are created on first selection. Every update is mirrored into
//! the Prometheus facade in [`crate::observability::metrics`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics as export;

/// Live counters for one load balancer.
#[derive(Debug, Default)]
pub struct Metrics {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    active_backends: AtomicI64,
    /// `f64` bit pattern.
    average_latency_ms: AtomicU64,
    requests_per_backend: DashMap<String, AtomicU64>,
}

/// Point-in-time copy returned by `GetMetrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub active_backends: i64,
    pub average_latency_ms: f64,
    pub requests_per_backend: BTreeMap<String, u64>,
}

impl Metrics {
    /// Create metrics for a pool whose backends all start alive.
    pub fn new(active_backends: usize) -> Self {
        let metrics = Self::default();
        metrics.active_backends.store(active_backends as i64, Ordering::Relaxed);
        export::record_active_backends(active_backends as i64);
        metrics
    }

    /// Count an incoming selection request, before any scan.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        export::record_request();
    }

    /// Count a selection that found no alive backend.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        export::record_selection_failure();
    }

    /// Count a selection of `address`.
    pub fn record_selection(&self, address: &str) {
        // Fast path avoids allocating the key once the entry exists.
        if let Some(counter) = self.requests_per_backend.get(address) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_per_backend
                .entry(address.to_string())
                .or_default()
                .fetch_add(1, Ordering::Relaxed);
        }
        export::record_backend_request(address);
    }

    /// Adjust the alive count by one when a backend flips.
    pub fn backend_went_down(&self) {
        let now = self.active_backends.fetch_sub(1, Ordering::Relaxed) - 1;
        export::record_active_backends(now);
    }

    pub fn backend_came_up(&self) {
        let now = self.active_backends.fetch_add(1, Ordering::Relaxed) + 1;
        export::record_active_backends(now);
    }

    /// Fold a successful probe's latency into the running value.
    ///
    /// Two-term smoothing `(previous + sample_ms) / 2` over whole
    /// milliseconds, kept for compatibility with existing consumers.
    /// This is not a windowed average.
    pub fn record_latency(&self, latency: Duration) {
        let sample = latency.as_millis() as f64;
        let _ = self
            .average_latency_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let previous = f64::from_bits(bits);
                Some(((previous + sample) / 2.0).to_bits())
            });
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn active_backends(&self) -> i64 {
        self.active_backends.load(Ordering::Relaxed)
    }

    pub fn average_latency_ms(&self) -> f64 {
        f64::from_bits(self.average_latency_ms.load(Ordering::Relaxed))
    }

    /// Independent copy; later updates do not show through it.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests_per_backend = self
            .requests_per_backend
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            total_requests: self.total_requests(),
            failed_requests: self.failed_requests(),
            active_backends: self.active_backends(),
            average_latency_ms: self.average_latency_ms(),
            requests_per_backend,
        }
    }
}
