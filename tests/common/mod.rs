//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use edge_balancer::config::LoadBalancerConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Config whose periodic loop never fires during a test; probes run only
/// through explicit `health_check` calls.
#[allow(dead_code)]
pub fn manual_config(max_consecutive_failures: u32) -> LoadBalancerConfig {
    LoadBalancerConfig {
        health_check_interval_ms: 3_600_000,
        health_check_timeout_ms: 500,
        max_consecutive_failures,
        retry_timeout_ms: 1000,
    }
}

/// A mock backend whose response status can be flipped at runtime.
#[allow(dead_code)]
pub struct MockBackend {
    pub url: String,
    status: Arc<AtomicU16>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }
}

/// Start a mock backend on an ephemeral port answering every request with `status`.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = Arc::new(AtomicU16::new(status));
    let shared = status.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let code = shared.load(Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let status_text = match code {
                            200 => "200 OK",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            status_text
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend {
        url: format!("http://{}", addr),
        status,
    }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
