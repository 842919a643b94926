//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Mirror load balancer counters into the `metrics` facade
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `edge_lb_requests_total` (counter): selection attempts
//! - `edge_lb_failed_requests_total` (counter): selections with no alive backend
//! - `edge_lb_backend_requests_total` (counter): selections per backend
//! - `edge_lb_active_backends` (gauge): currently alive backends
//! - `edge_lb_backend_health` (gauge): 1=alive, 0=dead
//! - `edge_lb_probe_latency_seconds` (histogram): successful probe latency
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - The in-process `Metrics` stays the source of truth for snapshots

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request() {
    counter!("edge_lb_requests_total").increment(1);
}

pub fn record_selection_failure() {
    counter!("edge_lb_failed_requests_total").increment(1);
}

pub fn record_backend_request(backend: &str) {
    counter!("edge_lb_backend_requests_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_active_backends(count: i64) {
    gauge!("edge_lb_active_backends").set(count as f64);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("edge_lb_backend_health", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_probe_latency(backend: &str, latency: Duration) {
    histogram!("edge_lb_probe_latency_seconds", "backend" => backend.to_string())
        .record(latency.as_secs_f64());
}
