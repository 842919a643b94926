//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Configure log level from config, overridable through `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edge_balancer={}", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}
