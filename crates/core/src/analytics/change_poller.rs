//! Turns the storage change feed into cache invalidation.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{AnalyticsQueryTrait, ChangeFeed};
use crate::errors::{Error, Result};

/// Polls a [`ChangeFeed`] from a moving watermark.
pub struct ChangePoller {
    feed: Arc<dyn ChangeFeed>,
    watermark: Mutex<DateTime<Utc>>,
}

impl ChangePoller {
    /// Starts polling from `since`; changes recorded at or before it are
    /// assumed to be reflected already.
    pub fn new(feed: Arc<dyn ChangeFeed>, since: DateTime<Utc>) -> Self {
        Self {
            feed,
            watermark: Mutex::new(since),
        }
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        *self.watermark.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reads new changes and hands them to the query service. Returns the
    /// number of cache entries marked stale. The watermark only advances
    /// once every event was applied.
    pub async fn poll(&self, query: &dyn AnalyticsQueryTrait) -> Result<usize> {
        let since = self.watermark();
        let feed = Arc::clone(&self.feed);
        let batch = tokio::task::spawn_blocking(move || feed.changes_since(since))
            .await
            .map_err(|e| Error::Unexpected(format!("Change feed task failed: {}", e)))??;

        let mut marked = 0;
        for event in &batch.events {
            match query.handle_event(event).await {
                Ok(count) => marked += count,
                Err(e) => {
                    warn!("Failed to apply change {:?}: {}", event, e);
                    return Err(e);
                }
            }
        }

        *self.watermark.lock().unwrap_or_else(|e| e.into_inner()) = batch.watermark;
        if !batch.events.is_empty() {
            debug!(
                "Applied {} input changes, {} entries marked stale",
                batch.events.len(),
                marked
            );
        }
        Ok(marked)
    }
}
