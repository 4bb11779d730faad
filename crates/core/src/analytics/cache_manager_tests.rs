//! Tests for the analytics cache manager.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::analytics::*;
    use crate::events::DomainEvent;
    use crate::entities::{EntityGraph, EntityStatus};
    use crate::test_fixtures::*;
    use rust_decimal::Decimal;

    fn manager(computer: Arc<CountingComputer>) -> AnalyticsCacheManager {
        AnalyticsCacheManager::new(computer, AnalyticsConfig::default())
    }

    fn key(scope: &str) -> AnalyticsKey {
        AnalyticsKey::new(ReportKind::FundDistribution, scope, date(2025, 3, 31))
    }

    fn version(cached: &CachedAnalytics) -> Decimal {
        match cached.payload.as_ref() {
            AnalyticsPayload::FundDistribution(report) => report.total_value,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    // ============================================================================
    // Refresh and coalescing
    // ============================================================================

    #[tokio::test]
    async fn test_miss_computes_and_publishes() {
        let computer = Arc::new(CountingComputer::new(0));
        let cache = manager(computer.clone());

        assert!(cache.lookup(&key("all")).is_none());
        let refreshed = cache.refresh_or_coalesce(&key("all")).await.unwrap();

        assert_eq!(refreshed.state, CacheEntryState::Fresh);
        assert_eq!(version(&refreshed), Decimal::ONE);
        let cached = cache.lookup(&key("all")).unwrap();
        assert_eq!(cached.state, CacheEntryState::Fresh);
        assert_eq!(computer.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_computation() {
        let computer = Arc::new(CountingComputer::new(20));
        let cache = manager(computer.clone());
        let k = key("all");

        let (a, b, c) = tokio::join!(
            cache.refresh_or_coalesce(&k),
            cache.refresh_or_coalesce(&k),
            cache.refresh_or_coalesce(&k),
        );

        assert_eq!(computer.calls(), 1);
        assert_eq!(version(&a.unwrap()), Decimal::ONE);
        assert_eq!(version(&b.unwrap()), Decimal::ONE);
        assert_eq!(version(&c.unwrap()), Decimal::ONE);
        assert_eq!(cache.health().in_flight, 0);
    }

    #[tokio::test]
    async fn test_schedule_refresh_does_not_duplicate() {
        let computer = Arc::new(CountingComputer::new(20));
        let cache = manager(computer.clone());
        let k = key("all");

        cache.schedule_refresh(&k);
        cache.schedule_refresh(&k);
        let result = cache.wait_for_refresh(&k).await.unwrap();

        assert!(result.is_ok());
        assert_eq!(computer.calls(), 1);
        assert!(cache.wait_for_refresh(&k).await.is_none());
    }

    #[tokio::test]
    async fn test_different_keys_refresh_independently() {
        let computer = Arc::new(CountingComputer::new(5));
        let cache = manager(computer.clone());

        let key_q1 = key("2025-Q1");
        let key_all = key("all");
        let (a, b) = tokio::join!(
            cache.refresh_or_coalesce(&key_q1),
            cache.refresh_or_coalesce(&key_all),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(computer.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    // ============================================================================
    // Failures
    // ============================================================================

    #[tokio::test]
    async fn test_failure_keeps_last_good_payload() {
        let computer = Arc::new(CountingComputer::new(0));
        let cache = manager(computer.clone());
        let k = key("all");
        cache.refresh_or_coalesce(&k).await.unwrap();

        computer.fail_from_now();
        assert!(cache.mark_stale(&k));
        let failure = cache.refresh_or_coalesce(&k).await.unwrap_err();

        assert_eq!(failure.key, k.cache_key());
        let cached = cache.lookup(&k).unwrap();
        assert_eq!(cached.state, CacheEntryState::Stale);
        assert_eq!(version(&cached), Decimal::ONE);
        assert_eq!(cache.last_error(&k).as_deref(), Some("Unexpected error: source unavailable"));

        let health = cache.health();
        assert_eq!(health.recent_refreshes, 2);
        assert_eq!(health.recent_failures, 1);
        assert!(health.healthy);
        assert!(health.last_failure.is_some());
    }

    #[tokio::test]
    async fn test_failure_without_payload_leaves_nothing_cached() {
        let computer = Arc::new(CountingComputer::new(0));
        computer.fail_from_now();
        let cache = manager(computer.clone());

        assert!(cache.refresh_or_coalesce(&key("all")).await.is_err());

        assert!(cache.is_empty());
        assert!(!cache.health().healthy);
    }

    #[tokio::test]
    async fn test_panicking_computation_is_a_failure() {
        let cache = manager(Arc::new(CountingComputer::panicking()));

        let failure = cache.refresh_or_coalesce(&key("all")).await.unwrap_err();

        assert!(failure.message.contains("panicked"));
        assert_eq!(cache.health().in_flight, 0);
    }

    // ============================================================================
    // Staleness
    // ============================================================================

    #[tokio::test]
    async fn test_invalidation_during_refresh_keeps_entry_stale() {
        let computer = Arc::new(CountingComputer::new(20));
        let cache = manager(computer.clone());
        let k = key("all");

        cache.schedule_refresh(&k);
        assert!(cache.mark_stale(&k));
        let refreshed = cache.wait_for_refresh(&k).await.unwrap().unwrap();

        assert_eq!(refreshed.state, CacheEntryState::Stale);
        assert_eq!(cache.lookup(&k).unwrap().state, CacheEntryState::Stale);
    }

    #[tokio::test]
    async fn test_ttl_expiry_marks_stale() {
        let computer = Arc::new(CountingComputer::new(0));
        let config = AnalyticsConfig::default().with_cache_ttl(Duration::from_millis(1));
        let cache = AnalyticsCacheManager::new(computer, config);
        let k = key("all");
        cache.refresh_or_coalesce(&k).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.lookup(&k).unwrap().state, CacheEntryState::Stale);
    }

    #[tokio::test]
    async fn test_refresh_stale_only_touches_stale_entries() {
        let computer = Arc::new(CountingComputer::new(0));
        let cache = manager(computer.clone());
        cache
            .warm(&[key("all"), key("2025-Q1"), key("2024-Q4")])
            .await;
        assert_eq!(computer.calls(), 3);

        cache.mark_stale(&key("2025-Q1"));
        let summary = cache.refresh_stale().await;

        assert_eq!(
            summary,
            RefreshSummary {
                attempted: 1,
                succeeded: 1,
                failed: 0,
                skipped: 0,
                evicted: 0,
            }
        );
        assert_eq!(computer.calls(), 4);
        let refreshed = cache.lookup(&key("2025-Q1")).unwrap();
        assert_eq!(refreshed.state, CacheEntryState::Fresh);
        assert_eq!(version(&refreshed), Decimal::from(4));
    }

    #[tokio::test]
    async fn test_unread_entries_are_skipped_then_evicted() {
        let computer = Arc::new(CountingComputer::new(0));
        let config = AnalyticsConfig::default()
            .with_cache_ttl(Duration::from_millis(1))
            .with_refresh_window(Duration::from_millis(100))
            .with_evict_after(Duration::from_millis(300));
        let cache = AnalyticsCacheManager::new(computer.clone(), config);
        cache
            .warm(&[key("2024-12-31"), key("2025-01-31"), key("2025-02-28")])
            .await;
        assert_eq!(computer.calls(), 3);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.lookup(&key("2024-12-31")).is_some());
        let first = cache.refresh_stale().await;

        assert_eq!(first.attempted, 1);
        assert_eq!(first.skipped, 2);
        assert_eq!(first.evicted, 0);
        assert_eq!(computer.calls(), 4);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = cache.refresh_stale().await;

        assert_eq!(second.attempted, 0);
        assert_eq!(second.evicted, 2);
        assert_eq!(cache.keys(), vec![key("2024-12-31")]);
        assert_eq!(computer.calls(), 4);
    }

    #[tokio::test]
    async fn test_invalidate_targets_affected_entries() {
        let computer = Arc::new(CountingComputer::new(0));
        let cache = manager(computer);
        let graph = EntityGraph::new(
            vec![client("c1", EntityStatus::Active)],
            vec![product("p1", "c1", None, EntityStatus::Active)],
            vec![holding("h1", "p1", "f1", EntityStatus::Active)],
        );
        let as_of = date(2025, 3, 31);
        let revenue = AnalyticsKey::company(ReportKind::CompanyRevenue, as_of);
        let distribution = AnalyticsKey::company(ReportKind::FundDistribution, as_of);
        let client_irr = AnalyticsKey::new(ReportKind::ClientIrr, "c1", as_of);
        cache
            .warm(&[revenue.clone(), distribution.clone(), client_irr.clone()])
            .await;

        let impact = ChangeImpact::from_event(
            &DomainEvent::fee_configuration_changed(vec!["p1".to_string()]),
            &graph,
        );
        assert_eq!(cache.invalidate(&impact), 1);
        assert_eq!(cache.lookup(&revenue).unwrap().state, CacheEntryState::Stale);
        assert_eq!(cache.lookup(&distribution).unwrap().state, CacheEntryState::Fresh);

        let impact = ChangeImpact::from_event(
            &DomainEvent::activities_recorded(vec!["h1".to_string()]),
            &graph,
        );
        assert_eq!(cache.invalidate(&impact), 1);
        assert_eq!(cache.lookup(&client_irr).unwrap().state, CacheEntryState::Stale);

        let health = cache.health();
        assert_eq!(health.fresh_entries, 1);
        assert_eq!(health.stale_entries, 2);
    }
}
