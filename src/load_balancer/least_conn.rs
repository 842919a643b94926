//! Least Connections load balancing strategy.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{backend::Backend, Strategy};

/// Least connections selector.
/// Selects the alive backend with the minimum number of active connections
/// and takes one connection slot on it.
///
/// Selection increments without a matching decrement; the caller is
/// responsible for completion accounting if symmetric behavior is desired
/// (see [`Backend::release_connection`] and [`Backend::completion_guard`]).
/// Left unreleased, the counters only grow and the strategy behaves like a
/// biased rotation over long uptimes.
#[derive(Debug, Default)]
pub struct LeastConnections {
    scan: Mutex<()>,
}

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for LeastConnections {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // Serializes compare-and-increment across concurrent selections.
        let _scan = self.scan.lock();

        // In case of tie, the first one is selected (stability)
        let best = backends
            .iter()
            .filter(|b| b.is_alive())
            .min_by_key(|b| b.active_connections())?;

        best.inc_connections();
        Some(best.clone())
    }

    fn name(&self) -> &'static str {
        "least_connections"
    }
}
