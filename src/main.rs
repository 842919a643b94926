//! Edge balancer
//!
//! Runs the load balancing engine of a CDN edge node: loads the backend
//! set, probes backends in the background, and serves admin/metrics
//! endpoints until asked to stop.
//!
//! ```text
//!   config ──▶ LoadBalancer ──▶ health loop (probes /health on each backend)
//!                  │
//!                  ├──▶ admin router  (/health, /ready, /lb/*)
//!                  └──▶ Prometheus exporter
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_balancer::admin::setup_admin_router;
use edge_balancer::config::{load_config, EdgeConfig};
use edge_balancer::lifecycle::signals::wait_for_signal;
use edge_balancer::observability::logging;
use edge_balancer::observability::metrics::init_metrics;
use edge_balancer::LoadBalancer;

#[derive(Parser)]
#[command(name = "edge-balancer")]
#[command(about = "Backend selection and health tracking for a CDN edge node", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("edge-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        strategy = ?config.strategy,
        backends = config.backends.len(),
        health_check_interval_ms = config.load_balancer.health_check_interval_ms,
        max_consecutive_failures = config.load_balancer.max_consecutive_failures,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let lb = Arc::new(LoadBalancer::from_config(&config)?);

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin endpoints listening");
        let router = setup_admin_router(lb.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_signal())
            .await?;
    } else {
        wait_for_signal().await;
    }

    lb.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
