use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::model::FundValuationDB;
use crate::db::{get_connection, DbPool};
use crate::errors::StorageResult;
use crate::schema::fund_valuations;
use crate::utils::{chunk_for_sqlite, format_date, format_timestamp};
use advisory_core::valuations::{Valuation, ValuationReaderTrait};
use advisory_core::{Error, Result};

pub fn read_valuations(
    conn: &mut SqliteConnection,
    holding_ids: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> StorageResult<Vec<Valuation>> {
    let start = start_date.map(format_date);
    let end = end_date.map(format_date);

    let mut rows = Vec::new();
    for chunk in chunk_for_sqlite(holding_ids) {
        let mut query = fund_valuations::table
            .filter(fund_valuations::holding_id.eq_any(chunk))
            .select(FundValuationDB::as_select())
            .into_boxed();
        if let Some(start) = &start {
            query = query.filter(fund_valuations::valuation_date.ge(start.clone()));
        }
        if let Some(end) = &end {
            query = query.filter(fund_valuations::valuation_date.le(end.clone()));
        }
        rows.extend(query.load::<FundValuationDB>(conn)?);
    }

    let mut valuations = rows
        .into_iter()
        .map(Valuation::try_from)
        .collect::<StorageResult<Vec<_>>>()?;
    valuations.sort_by(|a, b| {
        a.holding_id
            .cmp(&b.holding_id)
            .then_with(|| a.valuation_date.cmp(&b.valuation_date))
            .then_with(|| a.recorded_at.cmp(&b.recorded_at))
    });
    Ok(valuations)
}

/// The most recent valuation on or before `as_of` for each holding. When a
/// date was valued twice the later recording wins.
pub fn read_latest_valuations(
    conn: &mut SqliteConnection,
    holding_ids: &[String],
    as_of: NaiveDate,
) -> StorageResult<Vec<Valuation>> {
    let as_of = format_date(as_of);

    let mut latest = Vec::new();
    for chunk in chunk_for_sqlite(holding_ids) {
        let rows = fund_valuations::table
            .filter(fund_valuations::holding_id.eq_any(chunk))
            .filter(fund_valuations::valuation_date.le(as_of.as_str()))
            .order((
                fund_valuations::holding_id,
                fund_valuations::valuation_date.desc(),
                fund_valuations::recorded_at.desc(),
            ))
            .select(FundValuationDB::as_select())
            .load::<FundValuationDB>(conn)?;

        let mut seen = HashSet::new();
        for row in rows {
            if seen.insert(row.holding_id.clone()) {
                latest.push(Valuation::try_from(row)?);
            }
        }
    }
    Ok(latest)
}

pub fn read_valuations_recorded_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StorageResult<Vec<Valuation>> {
    fund_valuations::table
        .filter(fund_valuations::recorded_at.gt(format_timestamp(since)))
        .order((fund_valuations::recorded_at, fund_valuations::id))
        .select(FundValuationDB::as_select())
        .load::<FundValuationDB>(conn)?
        .into_iter()
        .map(Valuation::try_from)
        .collect()
}

pub struct ValuationRepository {
    pool: Arc<DbPool>,
}

impl ValuationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl ValuationReaderTrait for ValuationRepository {
    fn get_valuations_for_holdings(
        &self,
        holding_ids: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Valuation>> {
        let mut conn = get_connection(&self.pool)?;
        read_valuations(&mut conn, holding_ids, start_date, end_date).map_err(Error::from)
    }

    fn get_latest_valuations(
        &self,
        holding_ids: &[String],
        as_of: NaiveDate,
    ) -> Result<Vec<Valuation>> {
        let mut conn = get_connection(&self.pool)?;
        read_latest_valuations(&mut conn, holding_ids, as_of).map_err(Error::from)
    }

    fn get_valuations_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<Valuation>> {
        let mut conn = get_connection(&self.pool)?;
        read_valuations_recorded_since(&mut conn, since).map_err(Error::from)
    }
}
