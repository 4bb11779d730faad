//! Database model for ledger events.

use std::str::FromStr;

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::{format_date, format_timestamp, parse_date, parse_decimal, parse_timestamp};
use advisory_core::activities::{ActivityEvent, ActivityType};

/// One immutable ledger row. Amounts are stored as text so no precision is
/// lost.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::activity_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActivityEventDB {
    pub id: String,
    pub holding_id: String,
    pub activity_type: String,
    pub amount: String,
    pub event_date: String,
    pub related_fund_id: Option<String>,
    pub reversal_of: Option<String>,
    pub recorded_at: String,
}

impl TryFrom<ActivityEventDB> for ActivityEvent {
    type Error = StorageError;

    fn try_from(db: ActivityEventDB) -> Result<Self, Self::Error> {
        let activity_type = ActivityType::from_str(&db.activity_type)
            .map_err(|e| StorageError::Decode(format!("activity {}: {}", db.id, e)))?;
        Ok(ActivityEvent {
            amount: parse_decimal(&db.amount, "amount")?,
            event_date: parse_date(&db.event_date)?,
            recorded_at: parse_timestamp(&db.recorded_at)?,
            activity_type,
            id: db.id,
            holding_id: db.holding_id,
            related_fund_id: db.related_fund_id.filter(|id| !id.trim().is_empty()),
            reversal_of: db.reversal_of.filter(|id| !id.trim().is_empty()),
        })
    }
}

impl From<&ActivityEvent> for ActivityEventDB {
    fn from(event: &ActivityEvent) -> Self {
        Self {
            id: event.id.clone(),
            holding_id: event.holding_id.clone(),
            activity_type: event.activity_type.as_str().to_string(),
            amount: event.amount.to_string(),
            event_date: format_date(event.event_date),
            related_fund_id: event.related_fund_id.clone(),
            reversal_of: event.reversal_of.clone(),
            recorded_at: format_timestamp(event.recorded_at),
        }
    }
}
