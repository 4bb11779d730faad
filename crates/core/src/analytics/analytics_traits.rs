//! Seams of the analytics engine.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{
    AnalyticsHealth, AnalyticsKey, AnalyticsPayload, AnalyticsResponse, AnalyticsSnapshot,
    RefreshSummary, SnapshotScope,
};
use crate::entities::EntityGraph;
use crate::errors::Result;
use crate::events::DomainEvent;

/// Reads analytics inputs. Implementations must read each snapshot in a
/// single transaction. Calls are blocking.
pub trait AnalyticsSnapshotSource: Send + Sync {
    fn load_snapshot(&self, scope: &SnapshotScope, as_of: NaiveDate) -> Result<AnalyticsSnapshot>;

    /// Current entity graph, used to resolve invalidation targets.
    fn load_entity_graph(&self) -> Result<EntityGraph>;
}

/// Produces the payload of a report.
#[async_trait]
pub trait AnalyticsComputer: Send + Sync {
    async fn compute(&self, key: &AnalyticsKey) -> Result<AnalyticsPayload>;
}

/// Input changes recorded after a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub events: Vec<DomainEvent>,
    /// Pass this back as `since` on the next poll.
    pub watermark: DateTime<Utc>,
}

/// Pollable feed of input changes.
pub trait ChangeFeed: Send + Sync {
    fn changes_since(&self, since: DateTime<Utc>) -> Result<ChangeBatch>;
}

/// Read path of the analytics engine.
#[async_trait]
pub trait AnalyticsQueryTrait: Send + Sync {
    /// Cached report, computed on a miss.
    async fn get_analytics(
        &self,
        report: &str,
        scope: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<AnalyticsResponse>;

    fn get_health_check(&self) -> AnalyticsHealth;

    /// Marks entries affected by an input change stale. Returns how many.
    async fn handle_event(&self, event: &DomainEvent) -> Result<usize>;

    /// Refreshes every stale entry.
    async fn refresh_stale(&self) -> RefreshSummary;
}
