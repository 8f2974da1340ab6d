//! Shutdown coordination.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::wait_for_signal;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe before they start; a single `trigger`
/// reaches every subscriber.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Harmless when nobody is listening.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = notified, "Shutdown triggered");
    }

    /// Number of subscribers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Trigger shutdown when the process receives Ctrl+C or SIGTERM.
    pub fn trigger_on_signal(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            shutdown.trigger();
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
