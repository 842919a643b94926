//! Backend registry.
//!
//! # Responsibilities
//! - Validate and build the ordered backend sequence
//! - Share it read-only with the strategy and the health checker
//!
//! The sequence is fixed in length and addresses after construction.
//! Order matters: it drives round-robin rotation and every tie-break.

use std::sync::Arc;

use crate::config::validation::{parse_backend_url, validate_addresses};
use crate::load_balancer::backend::Backend;
use crate::load_balancer::error::LoadBalancerError;

/// Ordered, immutable set of backends.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Arc<[Arc<Backend>]>,
}

impl BackendPool {
    /// Build a pool where every backend has weight 1.
    pub fn new<S: AsRef<str>>(
        addresses: &[S],
        health_path: &str,
    ) -> Result<Self, LoadBalancerError> {
        let weights = vec![1; addresses.len()];
        Self::with_weights(addresses, &weights, health_path)
    }

    /// Build a pool with one weight per address.
    pub fn with_weights<S: AsRef<str>>(
        addresses: &[S],
        weights: &[u32],
        health_path: &str,
    ) -> Result<Self, LoadBalancerError> {
        let addresses: Vec<&str> = addresses.iter().map(|a| a.as_ref()).collect();

        if let Some(first) = validate_addresses(&addresses).into_iter().next() {
            return Err(LoadBalancerError::InvalidBackends(first.to_string()));
        }
        if weights.len() != addresses.len() {
            return Err(LoadBalancerError::InvalidBackends(format!(
                "{} addresses but {} weights",
                addresses.len(),
                weights.len()
            )));
        }
        if let Some(i) = weights.iter().position(|w| *w == 0) {
            return Err(LoadBalancerError::InvalidBackends(format!(
                "backend {:?} has weight 0",
                addresses[i]
            )));
        }

        let backends = addresses
            .iter()
            .zip(weights)
            .map(|(address, weight)| {
                let url = parse_backend_url(address).map_err(LoadBalancerError::InvalidBackends)?;
                Ok(Arc::new(Backend::new(*address, &url, health_path, *weight)))
            })
            .collect::<Result<Vec<_>, LoadBalancerError>>()?;

        Ok(Self {
            backends: backends.into(),
        })
    }

    /// All backends in registry order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}
