use chrono::{DateTime, NaiveDate, Utc};

use super::activities_model::ActivityEvent;
use crate::errors::Result;

/// Read-only access to the activity ledger.
///
/// The ledger is owned by the back-office CRUD layer; the analytics engine
/// never writes to it.
pub trait ActivityLedgerReaderTrait: Send + Sync {
    /// Events of the given holdings with `event_date` inside the inclusive
    /// range, ordered by event date then recording time.
    fn get_activities_for_holdings(
        &self,
        holding_ids: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<ActivityEvent>>;

    /// Events recorded strictly after `since`, for change polling.
    fn get_activities_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityEvent>>;
}
