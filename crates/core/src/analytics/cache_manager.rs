//! Keyed cache of analytics payloads with stale-while-revalidate refresh.
//!
//! Every refresh, whether triggered by a request or by the scheduler, goes
//! through [`AnalyticsCacheManager::refresh_or_coalesce`]. A key has at most
//! one refresh in flight; later callers await the same shared future. The
//! refresh itself runs on its own task, so a caller that goes away never
//! cancels it.
//!
//! Entries remember when they were last read. The scheduler pass only
//! recomputes entries read within `refresh_window` and drops entries idle
//! for longer than `evict_after`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, info, warn};

use super::refresh_log::RefreshLog;
use super::{
    AnalyticsComputer, AnalyticsConfig, AnalyticsHealth, AnalyticsKey, AnalyticsPayload,
    CacheEntryState, ChangeImpact, RefreshOutcome, RefreshSummary,
};
use crate::errors::{CacheRefreshFailure, Error};

type RefreshResult = std::result::Result<CachedAnalytics, CacheRefreshFailure>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// A payload as served from the cache.
#[derive(Debug, Clone)]
pub struct CachedAnalytics {
    pub payload: Arc<AnalyticsPayload>,
    pub computed_at: DateTime<Utc>,
    pub state: CacheEntryState,
}

#[derive(Debug, Clone)]
struct Published {
    payload: Arc<AnalyticsPayload>,
    computed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheEntry {
    published: Option<Published>,
    state: CacheEntryState,
    /// Bumped on every invalidation.
    generation: u64,
    last_error: Option<String>,
    last_read: Instant,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            published: None,
            state: CacheEntryState::Stale,
            generation: 0,
            last_error: None,
            last_read: Instant::now(),
        }
    }

    fn expire_if_old(&mut self, ttl: Duration, now: DateTime<Utc>) {
        if self.state != CacheEntryState::Fresh {
            return;
        }
        let expired = self.published.as_ref().map_or(true, |published| {
            (now - published.computed_at)
                .to_std()
                .map_or(false, |age| age > ttl)
        });
        if expired {
            self.state = CacheEntryState::Stale;
        }
    }

    fn mark_stale(&mut self) {
        self.generation += 1;
        if self.state == CacheEntryState::Fresh {
            self.state = CacheEntryState::Stale;
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<AnalyticsKey, CacheEntry>,
    in_flight: HashMap<AnalyticsKey, SharedRefresh>,
}

struct Inner {
    computer: Arc<dyn AnalyticsComputer>,
    config: AnalyticsConfig,
    state: Mutex<CacheState>,
    log: Mutex<RefreshLog>,
}

/// Owner of every analytics cache entry.
#[derive(Clone)]
pub struct AnalyticsCacheManager {
    inner: Arc<Inner>,
}

impl AnalyticsCacheManager {
    pub fn new(computer: Arc<dyn AnalyticsComputer>, config: AnalyticsConfig) -> Self {
        let log = RefreshLog::new(config.health_window);
        Self {
            inner: Arc::new(Inner {
                computer,
                config,
                state: Mutex::new(CacheState::default()),
                log: Mutex::new(log),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refresh_log(&self) -> MutexGuard<'_, RefreshLog> {
        self.inner.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current payload of a key, if one was ever published. A FRESH entry
    /// past its TTL is returned (and kept) as STALE.
    pub fn lookup(&self, key: &AnalyticsKey) -> Option<CachedAnalytics> {
        let mut state = self.state();
        let entry = state.entries.get_mut(key)?;
        entry.last_read = Instant::now();
        entry.expire_if_old(self.inner.config.cache_ttl, Utc::now());
        let published = entry.published.as_ref()?;
        Some(CachedAnalytics {
            payload: Arc::clone(&published.payload),
            computed_at: published.computed_at,
            state: entry.state,
        })
    }

    /// Refreshes `key`, or joins the refresh already in flight for it.
    pub async fn refresh_or_coalesce(&self, key: &AnalyticsKey) -> RefreshResult {
        let refresh = {
            let mut state = self.state();
            match state.in_flight.get(key) {
                Some(refresh) => {
                    debug!("Joining in-flight refresh of {}", key);
                    refresh.clone()
                }
                None => self.start_refresh(&mut state, key),
            }
        };
        refresh.await
    }

    /// Starts a background refresh of `key` unless one is running.
    pub fn schedule_refresh(&self, key: &AnalyticsKey) {
        let mut state = self.state();
        if !state.in_flight.contains_key(key) {
            let _ = self.start_refresh(&mut state, key);
        }
    }

    /// Awaits the in-flight refresh of `key`, if any.
    pub async fn wait_for_refresh(&self, key: &AnalyticsKey) -> Option<RefreshResult> {
        let refresh = self.state().in_flight.get(key).cloned()?;
        Some(refresh.await)
    }

    fn start_refresh(&self, state: &mut CacheState, key: &AnalyticsKey) -> SharedRefresh {
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::empty);
        entry.state = CacheEntryState::Refreshing;
        let generation = entry.generation;

        let manager = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move { manager.run_refresh(task_key, generation).await });

        let failure_key = key.cache_key();
        let refresh = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => Err(CacheRefreshFailure::new(
                    failure_key,
                    Error::Unexpected(format!("Refresh task did not complete: {}", err)),
                )),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.clone(), refresh.clone());
        refresh
    }

    async fn run_refresh(self, key: AnalyticsKey, generation: u64) -> RefreshResult {
        let started = Instant::now();
        let computed = AssertUnwindSafe(self.inner.computer.compute(&key))
            .catch_unwind()
            .await;
        let computed = match computed {
            Ok(result) => result,
            Err(_) => Err(Error::Unexpected("Computation panicked".to_string())),
        };

        let finished_at = Utc::now();
        let result = {
            let mut state = self.state();
            state.in_flight.remove(&key);
            self.publish(&mut state, &key, generation, computed, finished_at)
        };

        let outcome = RefreshOutcome {
            key: key.cache_key(),
            succeeded: result.is_ok(),
            finished_at,
            duration_ms: started.elapsed().as_millis() as u64,
            error: result.as_ref().err().map(|failure| failure.message.clone()),
        };
        match &result {
            Ok(_) => debug!("Refreshed {} in {}ms", key, outcome.duration_ms),
            Err(failure) if failure.cause.is_request_error() => {
                debug!("Rejected request for {}: {}", key, failure.message);
                return result;
            }
            Err(failure) => warn!("Refresh of {} failed: {}", key, failure.message),
        }
        self.refresh_log().record(outcome);

        result
    }

    fn publish(
        &self,
        state: &mut CacheState,
        key: &AnalyticsKey,
        generation: u64,
        computed: std::result::Result<AnalyticsPayload, Error>,
        finished_at: DateTime<Utc>,
    ) -> RefreshResult {
        match computed {
            Ok(payload) => {
                let entry = state
                    .entries
                    .entry(key.clone())
                    .or_insert_with(CacheEntry::empty);
                let published = Published {
                    payload: Arc::new(payload),
                    computed_at: finished_at,
                };
                entry.published = Some(published.clone());
                entry.last_error = None;
                // Invalidated while computing: keep the payload but stay stale.
                entry.state = if entry.generation == generation {
                    CacheEntryState::Fresh
                } else {
                    CacheEntryState::Stale
                };
                Ok(CachedAnalytics {
                    payload: published.payload,
                    computed_at: published.computed_at,
                    state: entry.state,
                })
            }
            Err(err) => {
                let failure = CacheRefreshFailure::new(key.cache_key(), err);
                let has_payload = state
                    .entries
                    .get(key)
                    .is_some_and(|entry| entry.published.is_some());
                if has_payload {
                    if let Some(entry) = state.entries.get_mut(key) {
                        entry.state = CacheEntryState::Stale;
                        entry.last_error = Some(failure.message.clone());
                    }
                } else {
                    state.entries.remove(key);
                }
                Err(failure)
            }
        }
    }

    /// Marks one key stale. Returns false when the key is not cached.
    pub fn mark_stale(&self, key: &AnalyticsKey) -> bool {
        match self.state().entries.get_mut(key) {
            Some(entry) => {
                entry.mark_stale();
                true
            }
            None => false,
        }
    }

    /// Marks every entry touched by a change stale. Returns the count.
    pub fn invalidate(&self, impact: &ChangeImpact) -> usize {
        if impact.is_empty() {
            return 0;
        }
        let mut state = self.state();
        let mut marked = 0;
        for (key, entry) in state.entries.iter_mut() {
            if impact.affects(key) {
                entry.mark_stale();
                marked += 1;
            }
        }
        if marked > 0 {
            debug!("Marked {} analytics entries stale", marked);
        }
        marked
    }

    /// Evicts idle entries, then refreshes every STALE entry read within
    /// the refresh window, expired ones included, and waits for all of them.
    pub async fn refresh_stale(&self) -> RefreshSummary {
        let config = &self.inner.config;
        let (keys, skipped, evicted) = {
            let mut state = self.state();
            let evicted = evict_idle(&mut state, config.evict_after);
            let now = Utc::now();
            let mut keys = Vec::new();
            let mut skipped = 0;
            for (key, entry) in state.entries.iter_mut() {
                entry.expire_if_old(config.cache_ttl, now);
                if entry.state != CacheEntryState::Stale {
                    continue;
                }
                if entry.last_read.elapsed() > config.refresh_window {
                    skipped += 1;
                } else {
                    keys.push(key.clone());
                }
            }
            (keys, skipped, evicted)
        };

        if evicted > 0 {
            debug!("Evicted {} idle analytics entries", evicted);
        }
        let summary = RefreshSummary {
            skipped,
            evicted,
            ..self.refresh_all(&keys).await
        };
        if summary.attempted > 0 {
            info!(
                "Refreshed {} stale analytics entries ({} failed)",
                summary.succeeded, summary.failed
            );
        }
        summary
    }

    /// Computes the given keys up front.
    pub async fn warm(&self, keys: &[AnalyticsKey]) -> RefreshSummary {
        self.refresh_all(keys).await
    }

    async fn refresh_all(&self, keys: &[AnalyticsKey]) -> RefreshSummary {
        let results = join_all(keys.iter().map(|key| self.refresh_or_coalesce(key))).await;
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        RefreshSummary {
            attempted: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            ..RefreshSummary::default()
        }
    }

    /// Keys currently cached, in no particular order.
    pub fn keys(&self) -> Vec<AnalyticsKey> {
        self.state().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last refresh error of a key that still serves an older payload.
    pub fn last_error(&self, key: &AnalyticsKey) -> Option<String> {
        self.state()
            .entries
            .get(key)
            .and_then(|entry| entry.last_error.clone())
    }

    pub fn health(&self) -> AnalyticsHealth {
        let (fresh, stale, refreshing, in_flight) = {
            let mut state = self.state();
            let ttl = self.inner.config.cache_ttl;
            let now = Utc::now();
            let mut counts = (0, 0, 0);
            for entry in state.entries.values_mut() {
                entry.expire_if_old(ttl, now);
                match entry.state {
                    CacheEntryState::Fresh => counts.0 += 1,
                    CacheEntryState::Stale => counts.1 += 1,
                    CacheEntryState::Refreshing => counts.2 += 1,
                }
            }
            (counts.0, counts.1, counts.2, state.in_flight.len())
        };

        let log = self.refresh_log();
        AnalyticsHealth {
            healthy: log.is_healthy(),
            checked_at: Utc::now(),
            window: log.window(),
            recent_refreshes: log.len(),
            recent_failures: log.failures(),
            last_success_at: log.last_success_at(),
            last_failure: log.last_failure().cloned(),
            fresh_entries: fresh,
            stale_entries: stale,
            refreshing_entries: refreshing,
            in_flight,
        }
    }
}

/// Drops entries nobody read for `evict_after`. Entries with a refresh in
/// flight stay until it publishes.
fn evict_idle(state: &mut CacheState, evict_after: Duration) -> usize {
    let CacheState { entries, in_flight } = state;
    let before = entries.len();
    entries.retain(|key, entry| {
        in_flight.contains_key(key) || entry.last_read.elapsed() <= evict_after
    });
    before - entries.len()
}
