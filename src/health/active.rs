//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends, all of them concurrently
//! - Update backend health state and the aggregate alive count
//! - Fold probe latency into the shared metrics

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header::USER_AGENT, Method, Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::LoadBalancerConfig;
use crate::health::state::Transition;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::metrics::Metrics;
use crate::load_balancer::pool::BackendPool;
use crate::observability::metrics as export;

/// Why a single probe counted as a failure.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Transport(String),

    #[error("non-success status {0}")]
    Status(StatusCode),

    #[error("could not build request: {0}")]
    Request(String),
}

/// Probes every backend of a pool and records the outcome.
#[derive(Debug)]
pub struct HealthChecker {
    pool: BackendPool,
    metrics: Arc<Metrics>,
    timeout: Duration,
    max_failures: u32,
    client: Client<HttpConnector, Body>,
}

impl HealthChecker {
    pub fn new(pool: BackendPool, metrics: Arc<Metrics>, config: &LoadBalancerConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            metrics,
            timeout: config.health_check_timeout(),
            max_failures: config.max_consecutive_failures,
            client,
        }
    }

    /// Run probe cycles every `interval` until `shutdown` fires or its sender
    /// is dropped. A shutdown during a cycle cancels the outstanding probes.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            backends = self.pool.len(),
            "Health monitor starting"
        );

        // First cycle one full period after start.
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.check_all() => {}
                        _ = shutdown.recv() => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// One probe cycle: probe every backend concurrently and wait for all.
    pub async fn check_all(&self) {
        join_all(self.pool.backends().iter().map(|backend| self.check_backend(backend))).await;
    }

    async fn check_backend(&self, backend: &Backend) {
        let start = Instant::now();
        let outcome = self.probe(backend).await;
        let latency = start.elapsed();

        match outcome {
            Ok(()) => {
                if backend.mark_success() == Some(Transition::CameUp) {
                    self.metrics.backend_came_up();
                    tracing::info!(addr = %backend.address(), "Backend is alive again");
                }
                self.metrics.record_latency(latency);
                export::record_probe_latency(backend.address(), latency);
            }
            Err(e) => {
                tracing::warn!(addr = %backend.address(), error = %e, "Health check failed");
                if backend.mark_failure(self.max_failures) == Some(Transition::WentDown) {
                    self.metrics.backend_went_down();
                    tracing::info!(
                        addr = %backend.address(),
                        failures = backend.health().consecutive_failures,
                        "Backend marked dead"
                    );
                }
            }
        }

        export::record_backend_health(backend.address(), backend.is_alive());
    }

    async fn probe(&self, backend: &Backend) -> Result<(), ProbeError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(backend.probe_url().as_str())
            .header(USER_AGENT, "edge-balancer-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => Ok(()),
            Ok(Ok(response)) => Err(ProbeError::Status(response.status())),
            Ok(Err(e)) => Err(ProbeError::Transport(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers every connection with `status` and closes it.
    async fn fixed_status_backend(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    fn checker(addresses: &[String], max_failures: u32) -> HealthChecker {
        let pool = BackendPool::new(addresses, "/health").unwrap();
        let metrics = Arc::new(Metrics::new(pool.len()));
        let config = LoadBalancerConfig {
            health_check_timeout_ms: 500,
            max_consecutive_failures: max_failures,
            ..LoadBalancerConfig::default()
        };
        HealthChecker::new(pool, metrics, &config)
    }

    #[tokio::test]
    async fn test_probe_outcomes() {
        let ok = fixed_status_backend("200 OK").await;
        let broken = fixed_status_backend("503 Service Unavailable").await;
        let hc = checker(&[ok, broken], 3);

        assert!(hc.probe(&hc.pool.backends()[0]).await.is_ok());
        match hc.probe(&hc.pool.backends()[1]).await {
            Err(ProbeError::Status(status)) => assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE),
            other => panic!("unexpected probe result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let hc = checker(&[format!("http://{}", addr)], 1);
        hc.check_all().await;

        let backend = &hc.pool.backends()[0];
        assert!(!backend.is_alive());
        assert_eq!(hc.metrics.active_backends(), 0);
        assert!(backend.health().last_checked_at.is_some());
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let hc = checker(&[format!("http://{}", addr)], 3);
        let result = hc.probe(&hc.pool.backends()[0]).await;
        assert!(matches!(result, Err(ProbeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_success_updates_latency_and_state() {
        let ok = fixed_status_backend("200 OK").await;
        let hc = checker(&[ok], 3);
        let backend = hc.pool.backends()[0].clone();
        backend.mark_failure(1);
        hc.metrics.backend_went_down();

        hc.check_all().await;

        assert!(backend.is_alive());
        assert_eq!(backend.health().consecutive_failures, 0);
        assert_eq!(hc.metrics.active_backends(), 1);
        assert!(hc.metrics.average_latency_ms() >= 0.0);
    }

    #[tokio::test]
    async fn test_only_200_is_healthy() {
        let no_content = fixed_status_backend("204 No Content").await;
        let hc = checker(&[no_content], 1);

        hc.check_all().await;
        assert!(!hc.pool.backends()[0].is_alive());
        assert_eq!(hc.metrics.active_backends(), 0);
        assert_eq!(hc.metrics.average_latency_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let ok = fixed_status_backend("200 OK").await;
        let hc = Arc::new(checker(&[ok], 3));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(hc.clone().run(Duration::from_millis(20), rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(hc.pool.backends()[0].health().last_checked_at.is_some());
    }
}
