//! Shutdown coordination for the failover daemon.

use tokio::sync::broadcast;

use crate::failover::FailoverRegistry;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (health monitor, admin server) subscribe to the
/// broadcast channel. Triggering also cancels every pending recovery timer.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    registry: FailoverRegistry,
}

impl Shutdown {
    pub fn new(registry: FailoverRegistry) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, registry }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Cancel pending recoveries and notify subscribers.
    pub fn trigger(&self) {
        self.registry.shutdown();
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(notified, "Shutdown triggered");
    }

    /// Number of tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
