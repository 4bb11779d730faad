//! Web domain event sink implementation.

use std::sync::{Arc, Mutex};

use advisory_core::analytics::AnalyticsQueryTrait;
use advisory_core::events::{DomainEvent, DomainEventSink};
use tokio::sync::mpsc;

use super::queue_worker::event_queue_worker;

/// Domain event sink for the web server runtime.
///
/// The channel exists from construction so events emitted before
/// [`start_worker`](Self::start_worker) are buffered, not lost.
pub struct WebDomainEventSink {
    tx: mpsc::UnboundedSender<DomainEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<DomainEvent>>>,
}

impl WebDomainEventSink {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Spawns the background worker. Later calls are ignored.
    pub fn start_worker(&self, analytics: Arc<dyn AnalyticsQueryTrait>) {
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match rx {
            Some(rx) => {
                tokio::spawn(event_queue_worker(rx, analytics));
            }
            None => tracing::warn!("Domain event worker already started"),
        }
    }
}

impl Default for WebDomainEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainEventSink for WebDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Domain event worker has stopped; event dropped");
        }
    }
}
