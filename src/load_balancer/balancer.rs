//! The load balancer: registry, strategy, metrics and health loop together.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::validation::validate_timings;
use crate::config::{EdgeConfig, LoadBalancerConfig, StrategyKind};
use crate::health::HealthChecker;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{
    backend::Backend,
    error::{LoadBalancerError, LoadBalancerResult},
    least_conn::LeastConnections,
    metrics::{Metrics, MetricsSnapshot},
    pool::BackendPool,
    round_robin::RoundRobin,
    weighted::WeightedRoundRobin,
    Strategy,
};

const DEFAULT_HEALTH_PATH: &str = "/health";

/// Selects a backend per request and keeps backend health current.
///
/// Construction spawns the periodic health loop on the current Tokio
/// runtime. [`LoadBalancer::shutdown`] stops it; dropping the load balancer
/// closes the shutdown channel, which stops it as well.
#[derive(Debug)]
pub struct LoadBalancer {
    pool: BackendPool,
    strategy: Box<dyn Strategy>,
    metrics: Arc<Metrics>,
    checker: Arc<HealthChecker>,
    config: LoadBalancerConfig,
    shutdown: Shutdown,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl LoadBalancer {
    /// Plain rotation over alive backends.
    pub fn round_robin<S: AsRef<str>>(
        addresses: &[S],
        config: LoadBalancerConfig,
    ) -> LoadBalancerResult<Self> {
        let pool = BackendPool::new(addresses, DEFAULT_HEALTH_PATH)?;
        Self::start(pool, Box::new(RoundRobin::new()), config)
    }

    /// Smooth weighted round-robin; `weights` pairs with `addresses` by position.
    pub fn weighted_round_robin<S: AsRef<str>>(
        addresses: &[S],
        weights: &[u32],
        config: LoadBalancerConfig,
    ) -> LoadBalancerResult<Self> {
        let pool = BackendPool::with_weights(addresses, weights, DEFAULT_HEALTH_PATH)?;
        let strategy = WeightedRoundRobin::new(pool.backends());
        Self::start(pool, Box::new(strategy), config)
    }

    /// Fewest active connections wins.
    pub fn least_connections<S: AsRef<str>>(
        addresses: &[S],
        config: LoadBalancerConfig,
    ) -> LoadBalancerResult<Self> {
        let pool = BackendPool::new(addresses, DEFAULT_HEALTH_PATH)?;
        Self::start(pool, Box::new(LeastConnections::new()), config)
    }

    /// Build from a loaded configuration file.
    pub fn from_config(config: &EdgeConfig) -> LoadBalancerResult<Self> {
        let addresses: Vec<&str> = config.backends.iter().map(|b| b.address.as_str()).collect();
        let weights: Vec<u32> = config.backends.iter().map(|b| b.weight).collect();
        let pool = BackendPool::with_weights(&addresses, &weights, &config.health_check.path)?;

        let strategy: Box<dyn Strategy> = match config.strategy {
            StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
            StrategyKind::WeightedRoundRobin => Box::new(WeightedRoundRobin::new(pool.backends())),
            StrategyKind::LeastConnections => Box::new(LeastConnections::new()),
        };
        Self::start(pool, strategy, config.load_balancer.clone())
    }

    fn start(
        pool: BackendPool,
        strategy: Box<dyn Strategy>,
        config: LoadBalancerConfig,
    ) -> LoadBalancerResult<Self> {
        if let Some(first) = validate_timings(&config).into_iter().next() {
            return Err(LoadBalancerError::InvalidConfig(first.to_string()));
        }
        let runtime = Handle::try_current().map_err(|_| LoadBalancerError::NoRuntime)?;

        let metrics = Arc::new(Metrics::new(pool.len()));
        let checker = Arc::new(HealthChecker::new(pool.clone(), metrics.clone(), &config));
        let shutdown = Shutdown::new();

        let task = runtime.spawn(
            checker
                .clone()
                .run(config.health_check_interval(), shutdown.subscribe()),
        );

        tracing::info!(
            strategy = strategy.name(),
            backends = pool.len(),
            "Load balancer started"
        );

        Ok(Self {
            pool,
            strategy,
            metrics,
            checker,
            config,
            shutdown,
            health_task: Mutex::new(Some(task)),
        })
    }

    /// Pick the backend for one request.
    ///
    /// Never blocks on I/O, only on in-memory locks. Every call counts toward
    /// `total_requests`; a call that finds no alive backend also counts toward
    /// `failed_requests` and returns [`LoadBalancerError::NoAvailableBackends`].
    pub fn next_backend(&self) -> LoadBalancerResult<Arc<Backend>> {
        self.metrics.record_request();

        match self.strategy.select(self.pool.backends()) {
            Some(backend) => {
                self.metrics.record_selection(backend.address());
                tracing::debug!(
                    backend = %backend.address(),
                    strategy = self.strategy.name(),
                    "Backend selected"
                );
                Ok(backend)
            }
            None => {
                self.metrics.record_failure();
                tracing::debug!(backend_count = self.pool.len(), "No alive backend found");
                Err(LoadBalancerError::NoAvailableBackends)
            }
        }
    }

    /// Run one probe cycle over every backend and wait for it to finish.
    ///
    /// Probe failures land in backend state, never in the return value.
    /// Dropping the future cancels the probes still in flight.
    pub async fn health_check(&self) {
        self.checker.check_all().await;
    }

    /// Consistent copy of the current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// All backends in registry order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        self.pool.backends()
    }

    /// Timings and thresholds this load balancer was built with.
    pub fn config(&self) -> &LoadBalancerConfig {
        &self.config
    }

    /// Retry budget for the caller's own retry policy; unused here.
    pub fn retry_timeout(&self) -> Duration {
        self.config.retry_timeout()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Whether the periodic health loop is still running.
    pub fn is_health_loop_running(&self) -> bool {
        self.health_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the periodic health loop and wait for it to exit.
    pub async fn shutdown(&self) {
        if self.shutdown.trigger() {
            tracing::info!("Load balancer shutting down");
        }
        let task = self.health_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Health loop ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> LoadBalancerConfig {
        // Long interval: only explicit health checks run during a test.
        LoadBalancerConfig {
            health_check_interval_ms: 3_600_000,
            ..LoadBalancerConfig::default()
        }
    }

    #[test]
    fn test_requires_runtime() {
        let err = LoadBalancer::round_robin(&["http://a:1"], quiet_config()).unwrap_err();
        assert_eq!(err, LoadBalancerError::NoRuntime);
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = LoadBalancerConfig {
            max_consecutive_failures: 0,
            ..quiet_config()
        };
        let err = LoadBalancer::least_connections(&["http://a:1"], config).unwrap_err();
        assert!(matches!(err, LoadBalancerError::InvalidConfig(_)));

        let err = LoadBalancer::weighted_round_robin(&["http://a:1"], &[1, 2], quiet_config())
            .unwrap_err();
        assert!(matches!(err, LoadBalancerError::InvalidBackends(_)));
    }

    #[tokio::test]
    async fn test_exhaustion_counts() {
        let lb = LoadBalancer::round_robin(&["http://a:1", "http://b:1"], quiet_config()).unwrap();
        for b in lb.backends() {
            b.mark_failure(1);
        }

        let err = lb.next_backend().unwrap_err();
        assert!(err.is_unavailable());

        let m = lb.metrics();
        assert_eq!(m.total_requests, 1);
        assert_eq!(m.failed_requests, 1);
        assert!(m.requests_per_backend.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_sum_matches() {
        let lb = LoadBalancer::weighted_round_robin(
            &["http://a:1", "http://b:1"],
            &[2, 1],
            quiet_config(),
        )
        .unwrap();
        for _ in 0..7 {
            lb.next_backend().unwrap();
        }
        lb.backends()[0].mark_failure(1);
        lb.backends()[1].mark_failure(1);
        assert!(lb.next_backend().is_err());

        let m = lb.metrics();
        let sum: u64 = m.requests_per_backend.values().sum();
        assert_eq!(sum, m.total_requests - m.failed_requests);
        assert_eq!(m.total_requests, 8);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config: EdgeConfig = toml::from_str(
            r#"
            strategy = "least_connections"
            [health_check]
            path = "/status"
            [[backends]]
            address = "http://a:1"
            "#,
        )
        .unwrap();
        let lb = LoadBalancer::from_config(&config).unwrap();
        assert_eq!(lb.strategy_name(), "least_connections");
        assert_eq!(lb.backends()[0].probe_url().as_str(), "http://a:1/status");
        assert_eq!(lb.retry_timeout(), Duration::from_secs(1));
        assert_eq!(lb.metrics().active_backends, 1);
    }

    #[tokio::test]
    async fn test_from_builtin_default() {
        let config = EdgeConfig::default();
        let lb = LoadBalancer::from_config(&config).unwrap();
        assert_eq!(lb.strategy_name(), "weighted_round_robin");
        assert_eq!(lb.backends().len(), 1);
        assert_eq!(lb.backends()[0].address(), "http://backend:8080");
        assert_eq!(lb.config(), &config.load_balancer);
        assert_eq!(lb.next_backend().unwrap().address(), "http://backend:8080");
        lb.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let lb = LoadBalancer::round_robin(&["http://a:1"], quiet_config()).unwrap();
        assert!(lb.is_health_loop_running());
        lb.shutdown().await;
        assert!(!lb.is_health_loop_running());
        // Second call is a no-op.
        lb.shutdown().await;
    }
}
