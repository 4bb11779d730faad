use std::sync::Arc;

use advisory_core::analytics::{
    AnalyticsCacheManager, AnalyticsConfig, AnalyticsEngine, AnalyticsService, ChangePoller,
};
use advisory_core::events::DomainEventSink;
use advisory_storage_sqlite::{db, IrrResultRepository, SqliteAnalyticsSource};
use chrono::Utc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, domain_events::WebDomainEventSink};

pub struct AppState {
    pub analytics: AnalyticsService,
    /// Turns rows written by other systems into cache invalidations.
    pub change_poller: Arc<ChangePoller>,
    pub domain_event_sink: Arc<dyn DomainEventSink>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("ADV_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let (pool, writer) = db::open(&config.db_path)?;
    tracing::info!("Database path in use: {}", config.db_path);

    let source = Arc::new(SqliteAnalyticsSource::new(pool.clone()));
    let irr_results = Arc::new(IrrResultRepository::new(pool, writer));

    let analytics_config = AnalyticsConfig::default()
        .with_cache_ttl(config.cache_ttl)
        .with_refresh_window(config.cache_ttl * 2)
        .with_evict_after(config.cache_ttl * 4)
        .with_health_window(config.health_window);
    let engine = AnalyticsEngine::new(source.clone(), analytics_config.solver)
        .with_irr_repository(irr_results);
    let cache = AnalyticsCacheManager::new(Arc::new(engine), analytics_config);
    let analytics = AnalyticsService::new(cache, source.clone());

    let change_poller = Arc::new(ChangePoller::new(source, Utc::now()));

    let sink = WebDomainEventSink::new();
    sink.start_worker(Arc::new(analytics.clone()));

    Ok(Arc::new(AppState {
        analytics,
        change_poller,
        domain_event_sink: Arc::new(sink),
        db_path: config.db_path.clone(),
    }))
}
