//! Admin endpoints over a running load balancer.
//!
//! - `GET /health`, `GET /ready`: liveness and readiness of the edge node
//! - `GET /lb/metrics`: metrics snapshot
//! - `GET /lb/backends`: per-backend health and connections
//! - `POST /lb/health-check`: on-demand probe cycle

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::load_balancer::LoadBalancer;
use self::handlers::*;

pub fn setup_admin_router(lb: Arc<LoadBalancer>) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/ready", get(get_ready))
        .route("/lb/metrics", get(get_metrics))
        .route("/lb/backends", get(get_backends))
        .route("/lb/health-check", post(run_health_check))
        .with_state(lb)
}
