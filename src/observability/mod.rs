//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Load balancer and health checker produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
