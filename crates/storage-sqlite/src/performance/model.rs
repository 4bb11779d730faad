//! Database model for IRR results.

use std::str::FromStr;

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::{format_date, format_timestamp, parse_date, parse_decimal, parse_timestamp};
use advisory_core::performance::{EntityLevel, IrrMethod, IrrResult};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::irr_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IrrResultDB {
    pub id: String,
    pub entity_id: String,
    pub entity_level: String,
    pub rate: Option<String>,
    pub as_of_date: String,
    pub converged: bool,
    pub cash_flow_count: i32,
    pub iterations: i32,
    pub method: String,
    pub failure_reason: Option<String>,
    pub computed_at: String,
    pub is_latest: bool,
}

impl IrrResultDB {
    /// A new row is always the latest for its entity and date.
    pub fn latest(result: &IrrResult) -> Self {
        Self {
            id: result.id.clone(),
            entity_id: result.entity_id.clone(),
            entity_level: result.entity_level.as_str().to_string(),
            rate: result.rate.map(|r| r.to_string()),
            as_of_date: format_date(result.as_of_date),
            converged: result.converged,
            cash_flow_count: i32::try_from(result.cash_flow_count).unwrap_or(i32::MAX),
            iterations: i32::try_from(result.iterations).unwrap_or(i32::MAX),
            method: result.method.as_str().to_string(),
            failure_reason: result.failure_reason.clone(),
            computed_at: format_timestamp(result.computed_at),
            is_latest: true,
        }
    }
}

impl TryFrom<IrrResultDB> for IrrResult {
    type Error = StorageError;

    fn try_from(db: IrrResultDB) -> Result<Self, Self::Error> {
        let entity_level = EntityLevel::from_str(&db.entity_level).map_err(StorageError::Decode)?;
        let method = IrrMethod::from_str(&db.method).map_err(StorageError::Decode)?;
        let rate = db
            .rate
            .as_deref()
            .map(|r| parse_decimal(r, "rate"))
            .transpose()?;
        Ok(IrrResult {
            entity_level,
            method,
            rate,
            as_of_date: parse_date(&db.as_of_date)?,
            computed_at: parse_timestamp(&db.computed_at)?,
            converged: db.converged,
            cash_flow_count: u32::try_from(db.cash_flow_count).unwrap_or_default(),
            iterations: u32::try_from(db.iterations).unwrap_or_default(),
            id: db.id,
            entity_id: db.entity_id,
            failure_reason: db.failure_reason,
        })
    }
}
