//! Database model for fee configuration.
//!
//! Fee columns keep the raw text entered by advisers; parsing happens in
//! `FeeConfiguration::from_raw` so the stored value is never rewritten.

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};
use advisory_core::fees::FeeConfiguration;

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::fee_configurations)]
#[diesel(primary_key(product_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FeeConfigurationDB {
    pub product_id: String,
    pub fixed_fee_direct: Option<String>,
    pub fixed_fee_facilitated: Option<String>,
    pub percentage_fee_facilitated: Option<String>,
    pub updated_at: String,
}

impl TryFrom<FeeConfigurationDB> for FeeConfiguration {
    type Error = StorageError;

    fn try_from(db: FeeConfigurationDB) -> Result<Self, Self::Error> {
        let updated_at = parse_timestamp(&db.updated_at)?;
        FeeConfiguration::from_raw(
            db.product_id.as_str(),
            db.fixed_fee_direct.as_deref(),
            db.fixed_fee_facilitated.as_deref(),
            db.percentage_fee_facilitated.as_deref(),
            updated_at,
        )
        .map_err(|e| StorageError::Decode(format!("fees of {}: {}", db.product_id, e)))
    }
}

impl From<&FeeConfiguration> for FeeConfigurationDB {
    fn from(config: &FeeConfiguration) -> Self {
        Self {
            product_id: config.product_id.clone(),
            fixed_fee_direct: config.fixed_fee_direct.map(|d| d.to_string()),
            fixed_fee_facilitated: config.fixed_fee_facilitated.map(|d| d.to_string()),
            percentage_fee_facilitated: config.percentage_fee_facilitated.map(|d| d.to_string()),
            updated_at: format_timestamp(config.updated_at),
        }
    }
}
