//! Event queue worker.
//!
//! Receives events from an mpsc channel, debounces them, merges the batch
//! and applies it to the analytics cache.

use std::sync::Arc;
use std::time::Duration;

use advisory_core::analytics::AnalyticsQueryTrait;
use advisory_core::events::DomainEvent;
use tokio::sync::mpsc;

use super::planner::coalesce_events;

/// Debounce window for collecting events before processing.
pub(crate) const DEBOUNCE_DURATION: Duration = Duration::from_millis(250);

pub async fn event_queue_worker(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    analytics: Arc<dyn AnalyticsQueryTrait>,
) {
    tracing::info!("Domain event queue worker started");

    let mut pending_events: Vec<DomainEvent> = Vec::new();

    loop {
        if pending_events.is_empty() {
            match rx.recv().await {
                Some(event) => pending_events.push(event),
                None => break,
            }
            continue;
        }

        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => pending_events.push(event),
                None => {
                    process_event_batch(&pending_events, analytics.as_ref()).await;
                    break;
                }
            },
            _ = tokio::time::sleep(DEBOUNCE_DURATION) => {
                let batch = std::mem::take(&mut pending_events);
                process_event_batch(&batch, analytics.as_ref()).await;
            }
        }
    }

    tracing::info!("Domain event queue worker shutting down");
}

async fn process_event_batch(events: &[DomainEvent], analytics: &dyn AnalyticsQueryTrait) {
    let planned = coalesce_events(events);
    tracing::debug!(
        "Processing {} domain event(s) as {} change(s)",
        events.len(),
        planned.len()
    );

    let mut marked = 0;
    for event in &planned {
        match analytics.handle_event(event).await {
            Ok(count) => marked += count,
            Err(e) => tracing::warn!("Failed to apply {:?}: {}", event, e),
        }
    }
    if marked > 0 {
        tracing::info!("Marked {} analytics entries stale", marked);
    }
}
