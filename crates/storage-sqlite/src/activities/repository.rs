use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::model::ActivityEventDB;
use crate::db::{get_connection, DbPool};
use crate::errors::StorageResult;
use crate::schema::activity_events;
use crate::utils::{chunk_for_sqlite, format_date, format_timestamp};
use advisory_core::activities::{ActivityEvent, ActivityLedgerReaderTrait};
use advisory_core::{Error, Result};

/// Events of the given holdings with `start <= event_date <= end`, ordered
/// by date then id.
pub fn read_activities(
    conn: &mut SqliteConnection,
    holding_ids: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> StorageResult<Vec<ActivityEvent>> {
    let start = start_date.map(format_date);
    let end = end_date.map(format_date);

    let mut rows = Vec::new();
    for chunk in chunk_for_sqlite(holding_ids) {
        let mut query = activity_events::table
            .filter(activity_events::holding_id.eq_any(chunk))
            .select(ActivityEventDB::as_select())
            .into_boxed();
        if let Some(start) = &start {
            query = query.filter(activity_events::event_date.ge(start.clone()));
        }
        if let Some(end) = &end {
            query = query.filter(activity_events::event_date.le(end.clone()));
        }
        rows.extend(query.load::<ActivityEventDB>(conn)?);
    }

    let mut events = rows
        .into_iter()
        .map(ActivityEvent::try_from)
        .collect::<StorageResult<Vec<_>>>()?;
    events.sort_by(|a, b| a.event_date.cmp(&b.event_date).then_with(|| a.id.cmp(&b.id)));
    Ok(events)
}

pub fn read_activities_recorded_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StorageResult<Vec<ActivityEvent>> {
    activity_events::table
        .filter(activity_events::recorded_at.gt(format_timestamp(since)))
        .order((activity_events::recorded_at, activity_events::id))
        .select(ActivityEventDB::as_select())
        .load::<ActivityEventDB>(conn)?
        .into_iter()
        .map(ActivityEvent::try_from)
        .collect()
}

pub struct ActivityRepository {
    pool: Arc<DbPool>,
}

impl ActivityRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl ActivityLedgerReaderTrait for ActivityRepository {
    fn get_activities_for_holdings(
        &self,
        holding_ids: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<ActivityEvent>> {
        let mut conn = get_connection(&self.pool)?;
        read_activities(&mut conn, holding_ids, start_date, end_date).map_err(Error::from)
    }

    fn get_activities_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityEvent>> {
        let mut conn = get_connection(&self.pool)?;
        read_activities_recorded_since(&mut conn, since).map_err(Error::from)
    }
}
