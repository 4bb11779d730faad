use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::connection::Connection;
use diesel::sqlite::SqliteConnection;
use log::debug;

use crate::activities::{read_activities, read_activities_recorded_since};
use crate::db::{get_connection, DbPool};
use crate::entities::{read_entity_changes, read_entity_graph};
use crate::errors::StorageError;
use crate::fees::{read_fee_changes, read_fee_configurations};
use crate::valuations::{read_latest_valuations, read_valuations_recorded_since};
use advisory_core::analytics::{
    AnalyticsSnapshot, AnalyticsSnapshotSource, ChangeBatch, ChangeFeed, SnapshotScope,
};
use advisory_core::entities::EntityGraph;
use advisory_core::events::DomainEvent;
use advisory_core::{Error, Result};

/// Rows stamped this close to a poll are reported again by the next one. A
/// writer can commit after a row stamped later than its own, so the
/// watermark never passes the settle horizon.
const CHANGE_FEED_SETTLE_SECS: i64 = 5;

/// Reads analytics inputs from the pool. Every snapshot and change batch is
/// read inside one transaction so it reflects a single point in time.
pub struct SqliteAnalyticsSource {
    pool: Arc<DbPool>,
}

impl SqliteAnalyticsSource {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn later(current: Option<DateTime<Utc>>, candidate: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn unique(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids.dedup();
    ids
}

impl AnalyticsSnapshotSource for SqliteAnalyticsSource {
    fn load_snapshot(&self, scope: &SnapshotScope, as_of: NaiveDate) -> Result<AnalyticsSnapshot> {
        let mut pooled = get_connection(&self.pool)?;
        let conn: &mut SqliteConnection = &mut pooled;
        let snapshot = conn
            .transaction::<_, StorageError, _>(|conn| {
                let graph = read_entity_graph(conn)?;
                let holding_ids = scope.holding_ids(&graph);
                let activities = read_activities(conn, &holding_ids, None, Some(as_of))?;
                let valuations = read_latest_valuations(conn, &holding_ids, as_of)?;
                let fee_configurations = if scope.needs_fees() {
                    read_fee_configurations(conn, None)?
                        .into_iter()
                        .map(|config| (config.product_id.clone(), config))
                        .collect()
                } else {
                    Default::default()
                };

                Ok(AnalyticsSnapshot {
                    as_of,
                    graph,
                    activities,
                    valuations,
                    fee_configurations,
                    loaded_at: Utc::now(),
                })
            })
            .map_err(Error::from)?;

        debug!(
            "Loaded {:?} snapshot at {}: {} activities, {} valuations",
            scope,
            as_of,
            snapshot.activities.len(),
            snapshot.valuations.len()
        );
        Ok(snapshot)
    }

    fn load_entity_graph(&self) -> Result<EntityGraph> {
        let mut conn = get_connection(&self.pool)?;
        read_entity_graph(&mut conn).map_err(Error::from)
    }
}

impl ChangeFeed for SqliteAnalyticsSource {
    fn changes_since(&self, since: DateTime<Utc>) -> Result<ChangeBatch> {
        let horizon = Utc::now() - Duration::seconds(CHANGE_FEED_SETTLE_SECS);
        let mut pooled = get_connection(&self.pool)?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction::<_, StorageError, _>(|conn| {
            let mut events = Vec::new();

            let activities = read_activities_recorded_since(conn, since)?;
            let mut watermark = activities.iter().map(|a| a.recorded_at).max();
            events.push(DomainEvent::activities_recorded(unique(
                activities.into_iter().map(|a| a.holding_id).collect(),
            )));

            let valuations = read_valuations_recorded_since(conn, since)?;
            watermark = later(watermark, valuations.iter().map(|v| v.recorded_at).max());
            events.push(DomainEvent::valuations_recorded(unique(
                valuations.into_iter().map(|v| v.holding_id).collect(),
            )));

            let (product_ids, fees_changed_at) = read_fee_changes(conn, since)?;
            watermark = later(watermark, fees_changed_at);
            events.push(DomainEvent::fee_configuration_changed(unique(product_ids)));

            let entities = read_entity_changes(conn, since)?;
            watermark = later(watermark, entities.latest);
            events.push(DomainEvent::entity_status_changed(
                unique(entities.client_ids),
                unique(entities.product_ids),
                unique(entities.holding_ids),
            ));

            events.retain(|event| !event.is_empty());
            Ok(ChangeBatch {
                events,
                watermark: watermark.map_or(since, |w| w.min(horizon).max(since)),
            })
        })
        .map_err(Error::from)
    }
}
