use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;

use super::model::FeeConfigurationDB;
use crate::db::{get_connection, DbPool};
use crate::errors::{IntoCore, StorageResult};
use crate::schema::fee_configurations;
use crate::utils::{chunk_for_sqlite, format_timestamp, parse_timestamp};
use advisory_core::fees::{FeeConfiguration, FeeConfigurationReaderTrait};
use advisory_core::{Error, Result};

/// Decodes rows, skipping malformed fee entries. A skipped product reads as
/// having no configuration and is flagged by the revenue report.
fn decode(rows: Vec<FeeConfigurationDB>) -> Vec<FeeConfiguration> {
    rows.into_iter()
        .filter_map(|row| {
            let product_id = row.product_id.clone();
            match FeeConfiguration::try_from(row) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Ignoring fee configuration of {}: {}", product_id, e);
                    None
                }
            }
        })
        .collect()
}

/// Fee configuration of the given products, or of every product.
pub fn read_fee_configurations(
    conn: &mut SqliteConnection,
    product_ids: Option<&[String]>,
) -> StorageResult<Vec<FeeConfiguration>> {
    let rows = match product_ids {
        None => fee_configurations::table
            .select(FeeConfigurationDB::as_select())
            .order(fee_configurations::product_id)
            .load::<FeeConfigurationDB>(conn)?,
        Some(ids) => {
            let mut rows = Vec::new();
            for chunk in chunk_for_sqlite(ids) {
                rows.extend(
                    fee_configurations::table
                        .filter(fee_configurations::product_id.eq_any(chunk))
                        .select(FeeConfigurationDB::as_select())
                        .load::<FeeConfigurationDB>(conn)?,
                );
            }
            rows
        }
    };
    Ok(decode(rows))
}

/// Product ids whose fee configuration changed after `since`, with the
/// latest change time.
pub fn read_fee_changes(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> StorageResult<(Vec<String>, Option<DateTime<Utc>>)> {
    let rows = fee_configurations::table
        .filter(fee_configurations::updated_at.gt(format_timestamp(since)))
        .select((fee_configurations::product_id, fee_configurations::updated_at))
        .load::<(String, String)>(conn)?;

    let mut latest: Option<DateTime<Utc>> = None;
    let mut product_ids = Vec::with_capacity(rows.len());
    for (product_id, updated_at) in rows {
        let ts = parse_timestamp(&updated_at)?;
        latest = Some(latest.map_or(ts, |l| l.max(ts)));
        product_ids.push(product_id);
    }
    Ok((product_ids, latest))
}

pub struct FeeConfigurationRepository {
    pool: Arc<DbPool>,
}

impl FeeConfigurationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl FeeConfigurationReaderTrait for FeeConfigurationRepository {
    fn get_fee_configurations(
        &self,
        product_ids: Option<&[String]>,
    ) -> Result<Vec<FeeConfiguration>> {
        let mut conn = get_connection(&self.pool)?;
        read_fee_configurations(&mut conn, product_ids).map_err(Error::from)
    }

    fn get_fee_configurations_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeeConfiguration>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = fee_configurations::table
            .filter(fee_configurations::updated_at.gt(format_timestamp(since)))
            .order(fee_configurations::updated_at)
            .select(FeeConfigurationDB::as_select())
            .load::<FeeConfigurationDB>(&mut conn)
            .into_core()?;
        Ok(decode(rows))
    }
}
