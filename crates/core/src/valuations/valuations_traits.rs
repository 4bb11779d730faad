//! Reader trait for holding valuations.

use chrono::{DateTime, NaiveDate, Utc};

use super::Valuation;
use crate::errors::Result;

/// Read-only access to the valuation series.
pub trait ValuationReaderTrait: Send + Sync {
    /// Valuation series of the given holdings within an optional date range,
    /// ordered by holding then valuation date.
    fn get_valuations_for_holdings(
        &self,
        holding_ids: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Valuation>>;

    /// Latest valuation on or before `as_of` for each holding that has one.
    fn get_latest_valuations(&self, holding_ids: &[String], as_of: NaiveDate)
        -> Result<Vec<Valuation>>;

    /// Valuations recorded strictly after `since`, for change polling.
    fn get_valuations_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<Valuation>>;
}
