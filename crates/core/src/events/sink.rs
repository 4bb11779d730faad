//! Domain event sink trait and a recording implementation.

use std::sync::{Arc, Mutex, MutexGuard};

use super::DomainEvent;

/// Receiver of change notifications.
///
/// Called on the writer's path after a commit: implementations must not
/// block, and a lost event must never fail the write that produced it.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);

    /// Forwards each event to [`emit`](Self::emit) in order.
    fn emit_batch(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Keeps every event it receives so callers can assert what was emitted.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> MutexGuard<'_, Vec<DomainEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events())
    }
}

impl DomainEventSink for RecordingEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events().push(event);
    }
}
