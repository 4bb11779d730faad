//! Background scheduler for cache maintenance.
//!
//! Each tick polls the change feed, then recomputes every stale entry.

use std::sync::Arc;

use advisory_core::analytics::{AnalyticsQueryTrait, AnalyticsService, RefreshSummary};
use advisory_core::utils::time_utils::today;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Computes the company-wide reports for today so first requests hit the
/// cache.
pub fn spawn_cache_warmup(state: Arc<AppState>) {
    tokio::spawn(async move {
        let keys = AnalyticsService::default_keys(today());
        let summary = state.analytics.warm(&keys).await;
        info!(
            "Analytics cache warmed: {} of {} reports computed",
            summary.succeeded, summary.attempted
        );
    });
}

pub fn start_refresh_scheduler(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        info!("Analytics refresh scheduler started ({:?} interval)", every);

        let mut ticks = interval(every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            run_scheduled_refresh(&state).await;
        }
    });
}

/// One scheduler pass.
pub async fn run_scheduled_refresh(state: &AppState) -> RefreshSummary {
    match state.change_poller.poll(&state.analytics).await {
        Ok(0) => {}
        Ok(marked) => debug!("Change feed marked {} entries stale", marked),
        Err(e) => warn!("Change feed poll failed: {}", e),
    }

    let summary = state.analytics.refresh_stale().await;
    if summary.attempted > 0 {
        info!(
            "Refreshed {} stale analytics entries ({} failed)",
            summary.succeeded, summary.failed
        );
    }
    summary
}
