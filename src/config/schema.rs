//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! balancer. All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the edge balancer.
///
/// [`EdgeConfig::default`] is the built-in single-origin wiring used when no
/// file is given. A file that omits `strategy` or `backends` gets
/// `round_robin` and an empty list instead.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Selection strategy used for every request.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Origin backends, in registry order.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,

    /// Load balancer timings and thresholds.
    pub load_balancer: LoadBalancerConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::WeightedRoundRobin,
            backends: vec![BackendConfig {
                address: DEFAULT_BACKEND.to_string(),
                weight: default_weight(),
            }],
            load_balancer: LoadBalancerConfig::default(),
            health_check: HealthCheckConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Origin used by the built-in configuration.
pub const DEFAULT_BACKEND: &str = "http://backend:8080";

/// Backend selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
}

/// Origin backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://10.0.0.5:8080").
    pub address: String,

    /// Weight for weighted round-robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Timings and thresholds shared by every strategy.
///
/// Immutable for the lifetime of a load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Period of the background health loop in milliseconds.
    pub health_check_interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub health_check_timeout_ms: u64,

    /// Consecutive probe failures before a backend is marked dead.
    pub max_consecutive_failures: u32,

    /// Request-level retry budget, handed through to the proxy handler.
    pub retry_timeout_ms: u64,
}

impl LoadBalancerConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            health_check_interval_ms: 1000,
            health_check_timeout_ms: 1000,
            max_consecutive_failures: 3,
            retry_timeout_ms: 1000,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path appended to each backend address when probing.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin router.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
