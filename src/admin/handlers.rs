use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::load_balancer::{Backend, LoadBalancer, MetricsSnapshot};

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub weight: u32,
    pub alive: bool,
    pub consecutive_failures: u32,
    pub active_connections: usize,
    /// Milliseconds since the Unix epoch of the last probe, if any.
    pub last_checked_at_ms: Option<u64>,
}

impl From<&Backend> for BackendStatus {
    fn from(b: &Backend) -> Self {
        let health = b.health();
        Self {
            address: b.address().to_string(),
            weight: b.weight(),
            alive: health.alive,
            consecutive_failures: health.consecutive_failures,
            active_connections: b.active_connections(),
            last_checked_at_ms: health
                .last_checked_at
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64),
        }
    }
}

pub async fn get_health() -> &'static str {
    "healthy"
}

/// Ready while at least one backend can take traffic.
pub async fn get_ready(State(lb): State<Arc<LoadBalancer>>) -> (StatusCode, &'static str) {
    if lb.backends().iter().any(|b| b.is_alive()) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no backend available")
    }
}

pub async fn get_metrics(State(lb): State<Arc<LoadBalancer>>) -> Json<MetricsSnapshot> {
    Json(lb.metrics())
}

pub async fn get_backends(State(lb): State<Arc<LoadBalancer>>) -> Json<Vec<BackendStatus>> {
    Json(backend_statuses(&lb))
}

/// Probe every backend now, then report the result.
pub async fn run_health_check(State(lb): State<Arc<LoadBalancer>>) -> Json<Vec<BackendStatus>> {
    lb.health_check().await;
    Json(backend_statuses(&lb))
}

fn backend_statuses(lb: &LoadBalancer) -> Vec<BackendStatus> {
    lb.backends().iter().map(|b| BackendStatus::from(b.as_ref())).collect()
}
