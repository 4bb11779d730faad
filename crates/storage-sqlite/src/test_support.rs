//! Temporary databases and seed helpers for storage tests.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use tempfile::TempDir;

use crate::activities::ActivityEventDB;
use crate::db::{get_connection, open, DbPool, WriteHandle};
use crate::entities::{ClientDB, PortfolioFundDB, ProductDB};
use crate::fees::FeeConfigurationDB;
use crate::schema::{
    activity_events, client_products, clients, fee_configurations, fund_valuations,
    portfolio_funds,
};
use crate::utils::format_timestamp;
use crate::valuations::FundValuationDB;
use advisory_core::activities::{ActivityEvent, ActivityType};
use advisory_core::entities::{Client, EntityStatus, PortfolioFund, Product};
use advisory_core::fees::FeeConfiguration;
use advisory_core::valuations::Valuation;

pub struct TestStore {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    _dir: TempDir,
}

/// A migrated database in a fresh temp directory. Needs a Tokio runtime
/// for the writer actor.
pub fn test_store() -> TestStore {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.db");
    let (pool, writer) = open(&path.to_string_lossy()).expect("open store");
    TestStore {
        pool,
        writer,
        _dir: dir,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

impl TestStore {
    pub fn add_client(&self, id: &str, status: EntityStatus) {
        let row = ClientDB::from(&Client {
            id: id.to_string(),
            name: format!("Client {}", id),
            status,
        });
        diesel::insert_into(clients::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    pub fn add_product(&self, id: &str, client_id: &str, provider: Option<&str>) {
        let row = ProductDB::from(&Product {
            id: id.to_string(),
            client_id: client_id.to_string(),
            product_name: format!("Product {}", id),
            provider_id: provider.map(str::to_string),
            status: EntityStatus::Active,
        });
        diesel::insert_into(client_products::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    pub fn add_holding(&self, id: &str, product_id: &str, fund_id: &str) {
        let row = PortfolioFundDB::from(&PortfolioFund {
            id: id.to_string(),
            product_id: product_id.to_string(),
            fund_id: fund_id.to_string(),
            fund_name: format!("Fund {}", fund_id),
            status: EntityStatus::Active,
        });
        diesel::insert_into(portfolio_funds::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    /// Moves a product to a new status as of `at`.
    pub fn set_product_status(&self, id: &str, status: EntityStatus, at: DateTime<Utc>) {
        diesel::update(client_products::table.find(id))
            .set((
                client_products::status.eq(status.as_str()),
                client_products::updated_at.eq(format_timestamp(at)),
            ))
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    /// Pushes every entity's `updated_at` back so change-feed tests start
    /// from a clean slate.
    pub fn age_entities(&self, at: DateTime<Utc>) {
        let at = format_timestamp(at);
        let mut conn = get_connection(&self.pool).unwrap();
        diesel::update(clients::table)
            .set(clients::updated_at.eq(&at))
            .execute(&mut conn)
            .unwrap();
        diesel::update(client_products::table)
            .set(client_products::updated_at.eq(&at))
            .execute(&mut conn)
            .unwrap();
        diesel::update(portfolio_funds::table)
            .set(portfolio_funds::updated_at.eq(&at))
            .execute(&mut conn)
            .unwrap();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_activity(
        &self,
        id: &str,
        holding_id: &str,
        activity_type: ActivityType,
        amount: Decimal,
        event_date: NaiveDate,
        related_fund_id: Option<&str>,
        recorded_at: DateTime<Utc>,
    ) {
        let row = ActivityEventDB::from(&ActivityEvent {
            id: id.to_string(),
            holding_id: holding_id.to_string(),
            activity_type,
            amount,
            event_date,
            related_fund_id: related_fund_id.map(str::to_string),
            reversal_of: None,
            recorded_at,
        });
        diesel::insert_into(activity_events::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    pub fn add_valuation(
        &self,
        id: &str,
        holding_id: &str,
        valuation_date: NaiveDate,
        value: Decimal,
        recorded_at: DateTime<Utc>,
    ) {
        let row = FundValuationDB::from_valuation(
            id,
            &Valuation {
                holding_id: holding_id.to_string(),
                valuation_date,
                value,
                recorded_at,
            },
        );
        diesel::insert_into(fund_valuations::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    pub fn set_fees(&self, config: &FeeConfiguration) {
        let row = FeeConfigurationDB::from(config);
        diesel::replace_into(fee_configurations::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }

    /// Stores raw fee text as an adviser would have typed it.
    pub fn set_raw_fees(&self, product_id: &str, pct: &str, updated_at: DateTime<Utc>) {
        let row = FeeConfigurationDB {
            product_id: product_id.to_string(),
            fixed_fee_direct: None,
            fixed_fee_facilitated: None,
            percentage_fee_facilitated: Some(pct.to_string()),
            updated_at: format_timestamp(updated_at),
        };
        diesel::replace_into(fee_configurations::table)
            .values(&row)
            .execute(&mut get_connection(&self.pool).unwrap())
            .unwrap();
    }
}
