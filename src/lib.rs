//! Request-routing core of a CDN edge node.
//!
//! Picks the origin backend for each request, keeps backend health current
//! with a background prober, and aggregates routing metrics.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::EdgeConfig;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, LoadBalancer, LoadBalancerError, MetricsSnapshot};
