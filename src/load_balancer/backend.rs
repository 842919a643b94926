//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single origin server
//! - Track active connections (for Least Connections LB)
//! - Hold health state (alive/dead, consecutive failures, last probe time)

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use url::Url;

use crate::health::state::{HealthState, Transition};

/// A single origin server.
#[derive(Debug)]
pub struct Backend {
    address: String,
    probe_url: Url,
    weight: u32,
    active_connections: AtomicUsize,
    health: RwLock<HealthState>,
}

impl Backend {
    /// Create a new backend, alive until probes say otherwise.
    ///
    /// `base_url` is the parsed form of `address`; `health_path` is joined
    /// onto it to build the probe target.
    pub fn new(address: impl Into<String>, base_url: &Url, health_path: &str, weight: u32) -> Self {
        let mut probe_url = base_url.clone();
        let base_path = probe_url.path().trim_end_matches('/').to_string();
        probe_url.set_path(&format!("{}{}", base_path, health_path));

        Self {
            address: address.into(),
            probe_url,
            weight,
            active_connections: AtomicUsize::new(0),
            health: RwLock::new(HealthState::default()),
        }
    }

    /// Routing target as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// URL probed by the health checker.
    pub fn probe_url(&self) -> &Url {
        &self.probe_url
    }

    /// Static weight used by weighted round-robin.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Give back one connection slot taken by least-connections selection.
    ///
    /// Selection increments without a matching decrement; the caller is
    /// responsible for completion accounting if symmetric behavior is desired.
    /// Never goes below zero.
    pub fn release_connection(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Guard that calls [`Backend::release_connection`] when dropped.
    pub fn completion_guard(self: &Arc<Self>) -> ConnectionGuard {
        ConnectionGuard {
            backend: self.clone(),
        }
    }

    // --- Health Logic ---

    /// Whether the backend is eligible for selection.
    pub fn is_alive(&self) -> bool {
        self.health.read().alive
    }

    /// Copy of the current health state.
    pub fn health(&self) -> HealthState {
        *self.health.read()
    }

    /// Report a successful probe.
    pub fn mark_success(&self) -> Option<Transition> {
        self.health.write().record_success(SystemTime::now())
    }

    /// Report a failed probe.
    pub fn mark_failure(&self, max_failures: u32) -> Option<Transition> {
        self.health.write().record_failure(max_failures, SystemTime::now())
    }
}

/// A RAII guard that releases one active connection on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl Deref for ConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.release_connection();
    }
}
