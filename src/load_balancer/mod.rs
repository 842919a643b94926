//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy handler asks for a backend
//!     → balancer.rs (count the request)
//!     → Apply the configured strategy over pool.rs:
//!         - round_robin.rs (rotate through alive backends)
//!         - weighted.rs (smooth weighted round-robin)
//!         - least_conn.rs (pick backend with fewest connections)
//!     → metrics.rs (per-backend tally, or failed request)
//!     → Return backend or NoAvailableBackends
//! ```
//!
//! # Design Decisions
//! - Strategies only choose; the balancer owns registry, metrics and health
//! - Each strategy states its own locking: atomic cursor, or a lock held
//!   across scan-and-update
//! - Dead backends excluded from selection
//! - Ties go to the first backend in registry order

use std::fmt::Debug;
use std::sync::Arc;

pub mod backend;
pub mod balancer;
pub mod error;
pub mod least_conn;
pub mod metrics;
pub mod pool;
pub mod round_robin;
pub mod weighted;

pub use backend::{Backend, ConnectionGuard};
pub use balancer::LoadBalancer;
pub use error::{LoadBalancerError, LoadBalancerResult};
pub use self::metrics::{Metrics, MetricsSnapshot};
pub use pool::BackendPool;

/// A backend choice rule.
pub trait Strategy: Send + Sync + Debug {
    /// Pick an alive backend, or `None` when none is alive.
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;

    /// Stable name for logs and metrics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) fn test_backends(addresses: &[&str]) -> Vec<Arc<Backend>> {
    BackendPool::new(addresses, "/health").unwrap().backends().to_vec()
}

#[cfg(test)]
pub(crate) fn test_weighted_backends(entries: &[(&str, u32)]) -> Vec<Arc<Backend>> {
    let addresses: Vec<&str> = entries.iter().map(|(a, _)| *a).collect();
    let weights: Vec<u32> = entries.iter().map(|(_, w)| *w).collect();
    BackendPool::with_weights(&addresses, &weights, "/health")
        .unwrap()
        .backends()
        .to_vec()
}
