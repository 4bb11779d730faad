//! The single read path into analytics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;

use super::{
    AnalyticsCacheManager, AnalyticsHealth, AnalyticsKey, AnalyticsQueryTrait, AnalyticsResponse,
    AnalyticsSnapshotSource, CacheEntryState, CachedAnalytics, ChangeImpact, RefreshSummary,
    ReportKind,
};
use crate::errors::{Error, Result};
use crate::events::DomainEvent;

/// Cache-first query service. It reads through the cache manager and asks
/// it to refresh; it never writes entries itself.
#[derive(Clone)]
pub struct AnalyticsService {
    cache: AnalyticsCacheManager,
    source: Arc<dyn AnalyticsSnapshotSource>,
}

impl AnalyticsService {
    pub fn new(cache: AnalyticsCacheManager, source: Arc<dyn AnalyticsSnapshotSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &AnalyticsCacheManager {
        &self.cache
    }

    /// Serves a resolved key.
    ///
    /// FRESH is returned as is. STALE is returned flagged and a background
    /// refresh is scheduled. REFRESHING returns the previous payload without
    /// waiting. Only a key with nothing to show is computed inline.
    pub async fn get(&self, key: &AnalyticsKey) -> Result<AnalyticsResponse> {
        if let Some(cached) = self.cache.lookup(key) {
            match cached.state {
                CacheEntryState::Fresh => {}
                CacheEntryState::Stale => {
                    debug!("Serving stale {} and scheduling refresh", key);
                    self.cache.schedule_refresh(key);
                }
                CacheEntryState::Refreshing => {
                    debug!("Serving previous {} while it refreshes", key);
                }
            }
            return Ok(respond(key, cached));
        }

        match self.cache.refresh_or_coalesce(key).await {
            Ok(cached) => Ok(respond(key, cached)),
            Err(failure) => Err(failure.to_error()),
        }
    }

    /// Company-wide keys computed at start-up so first requests hit the
    /// cache.
    pub fn default_keys(as_of: NaiveDate) -> Vec<AnalyticsKey> {
        ReportKind::ALL
            .into_iter()
            .filter(ReportKind::is_company_wide)
            .map(|report| AnalyticsKey::company(report, as_of))
            .collect()
    }

    pub async fn warm(&self, keys: &[AnalyticsKey]) -> RefreshSummary {
        self.cache.warm(keys).await
    }
}

fn respond(key: &AnalyticsKey, cached: CachedAnalytics) -> AnalyticsResponse {
    AnalyticsResponse {
        report: key.report,
        scope: key.scope.clone(),
        as_of: key.as_of,
        computed_at: cached.computed_at,
        is_stale: cached.state != CacheEntryState::Fresh,
        state: cached.state,
        rate_or_totals: cached.payload.as_ref().clone(),
    }
}

#[async_trait]
impl AnalyticsQueryTrait for AnalyticsService {
    async fn get_analytics(
        &self,
        report: &str,
        scope: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<AnalyticsResponse> {
        let report: ReportKind = report.parse()?;
        let key = AnalyticsKey::resolve(report, scope, as_of)?;
        self.get(&key).await
    }

    fn get_health_check(&self) -> AnalyticsHealth {
        self.cache.health()
    }

    async fn handle_event(&self, event: &DomainEvent) -> Result<usize> {
        if event.is_empty() {
            return Ok(0);
        }
        let source = Arc::clone(&self.source);
        let graph = tokio::task::spawn_blocking(move || source.load_entity_graph())
            .await
            .map_err(|e| Error::Unexpected(format!("Entity graph load task failed: {}", e)))??;

        let impact = ChangeImpact::from_event(event, &graph);
        Ok(self.cache.invalidate(&impact))
    }

    async fn refresh_stale(&self) -> RefreshSummary {
        self.cache.refresh_stale().await
    }
}
