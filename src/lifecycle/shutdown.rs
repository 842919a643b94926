//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinator for deterministic teardown of background tasks.
///
/// Long-running tasks subscribe to a broadcast channel. Dropping the last
/// handle closes the channel, which subscribers treat as a stop signal too.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Returns false if it had already been fired.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.tx.send(());
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
