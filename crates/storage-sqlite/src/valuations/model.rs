//! Database model for fund valuations.

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::{format_date, format_timestamp, parse_date, parse_decimal, parse_timestamp};
use advisory_core::valuations::Valuation;

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::fund_valuations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FundValuationDB {
    pub id: String,
    pub holding_id: String,
    pub valuation_date: String,
    pub value: String,
    pub recorded_at: String,
}

impl TryFrom<FundValuationDB> for Valuation {
    type Error = StorageError;

    fn try_from(db: FundValuationDB) -> Result<Self, Self::Error> {
        Ok(Valuation {
            valuation_date: parse_date(&db.valuation_date)?,
            value: parse_decimal(&db.value, "value")?,
            recorded_at: parse_timestamp(&db.recorded_at)?,
            holding_id: db.holding_id,
        })
    }
}

impl FundValuationDB {
    pub fn from_valuation(id: impl Into<String>, valuation: &Valuation) -> Self {
        Self {
            id: id.into(),
            holding_id: valuation.holding_id.clone(),
            valuation_date: format_date(valuation.valuation_date),
            value: valuation.value.to_string(),
            recorded_at: format_timestamp(valuation.recorded_at),
        }
    }
}
