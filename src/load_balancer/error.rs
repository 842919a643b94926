//! Load balancer errors.

use thiserror::Error;

/// Errors surfaced by construction and selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadBalancerError {
    /// No alive backend was found during a bounded scan.
    #[error("no backend available")]
    NoAvailableBackends,

    /// The backend list (addresses or weights) is unusable.
    #[error("invalid backends: {0}")]
    InvalidBackends(String),

    /// Timings or thresholds are out of range.
    #[error("invalid load balancer config: {0}")]
    InvalidConfig(String),

    /// Constructed outside a Tokio runtime, so the health loop cannot start.
    #[error("load balancer must be created inside a Tokio runtime")]
    NoRuntime,
}

impl LoadBalancerError {
    /// True for the "temporarily no capacity" case callers map to 503.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LoadBalancerError::NoAvailableBackends)
    }
}

/// Result type for load balancer operations.
pub type LoadBalancerResult<T> = Result<T, LoadBalancerError>;
