//! Analytics engine settings.

use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_EVICT_AFTER_SECS, DEFAULT_HEALTH_WINDOW,
    DEFAULT_REFRESH_WINDOW_SECS,
};
use crate::performance::SolverConfig;

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Age after which a FRESH entry is served as STALE.
    pub cache_ttl: Duration,
    /// Stale entries not read for this long are skipped by `refresh_stale`.
    pub refresh_window: Duration,
    /// Entries not read for this long are dropped.
    pub evict_after: Duration,
    /// Number of refresh outcomes kept for the health check.
    pub health_window: usize,
    pub solver: SolverConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            refresh_window: Duration::from_secs(DEFAULT_REFRESH_WINDOW_SECS),
            evict_after: Duration::from_secs(DEFAULT_EVICT_AFTER_SECS),
            health_window: DEFAULT_HEALTH_WINDOW,
            solver: SolverConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_refresh_window(mut self, refresh_window: Duration) -> Self {
        self.refresh_window = refresh_window;
        self
    }

    pub fn with_evict_after(mut self, evict_after: Duration) -> Self {
        self.evict_after = evict_after;
        self
    }

    pub fn with_health_window(mut self, health_window: usize) -> Self {
        self.health_window = health_window.max(1);
        self
    }
}
