//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → LoadBalancerConfig handed to the load balancer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BackendConfig, EdgeConfig, HealthCheckConfig, LoadBalancerConfig, DEFAULT_BACKEND,
    ObservabilityConfig, StrategyKind,
};
