//! Analytics module - report keys, engine, cache manager and query façade.

mod analytics_model;
mod analytics_traits;
mod cache_manager;
mod change_poller;
mod config;
mod engine;
mod invalidation;
mod query_facade;
mod refresh_log;
mod snapshot;

#[cfg(test)]
mod cache_manager_tests;

pub use analytics_model::*;
pub use analytics_traits::{
    AnalyticsComputer, AnalyticsQueryTrait, AnalyticsSnapshotSource, ChangeBatch, ChangeFeed,
};
pub use cache_manager::{AnalyticsCacheManager, CachedAnalytics};
pub use change_poller::ChangePoller;
pub use config::AnalyticsConfig;
pub use engine::{build_report, AnalyticsEngine};
pub use invalidation::ChangeImpact;
pub use query_facade::AnalyticsService;
pub use snapshot::{AnalyticsSnapshot, SnapshotScope};
