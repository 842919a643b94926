//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend addresses, weights and uniqueness
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{EdgeConfig, LoadBalancerConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one backend is required")]
    NoBackends,

    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("backend address {0:?} is listed more than once")]
    DuplicateAddress(String),

    #[error("backend {0:?} has weight 0")]
    ZeroWeight(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("health check path {0:?} must start with '/'")]
    InvalidHealthPath(String),

    #[error("{field} {value:?} is not a socket address")]
    InvalidBindAddress { field: &'static str, value: String },
}

/// Validate a whole configuration, collecting every problem found.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let addresses: Vec<&str> = config.backends.iter().map(|b| b.address.as_str()).collect();
    errors.extend(validate_addresses(&addresses));

    for backend in &config.backends {
        if backend.weight == 0 {
            errors.push(ValidationError::ZeroWeight(backend.address.clone()));
        }
    }

    errors.extend(validate_timings(&config.load_balancer));

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(config.health_check.path.clone()));
    }

    if config.observability.metrics_enabled {
        check_bind_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }
    if config.admin.enabled {
        check_bind_address("admin.bind_address", &config.admin.bind_address, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a backend address list: non-empty, well-formed and unique.
pub fn validate_addresses(addresses: &[&str]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if addresses.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for address in addresses {
        if let Err(reason) = parse_backend_url(address) {
            errors.push(ValidationError::InvalidAddress {
                address: address.to_string(),
                reason,
            });
        }
        if !seen.insert(*address) {
            errors.push(ValidationError::DuplicateAddress(address.to_string()));
        }
    }
    errors
}

/// Check the load balancer timings and thresholds.
pub fn validate_timings(config: &LoadBalancerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.health_check_interval_ms == 0 {
        errors.push(ValidationError::ZeroValue("load_balancer.health_check_interval_ms"));
    }
    if config.health_check_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("load_balancer.health_check_timeout_ms"));
    }
    if config.max_consecutive_failures == 0 {
        errors.push(ValidationError::ZeroValue("load_balancer.max_consecutive_failures"));
    }
    errors
}

/// Parse a backend base URL. Only plain `http://` origins with a host are accepted.
pub fn parse_backend_url(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, expected \"http\"", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

fn check_bind_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}
