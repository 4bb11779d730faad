use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use log::debug;

use super::model::IrrResultDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::irr_results;
use crate::utils::format_date;
use advisory_core::performance::{EntityLevel, IrrResult, IrrResultRepositoryTrait};
use advisory_core::{Error, Result};

/// Append-only store of IRR results. Every computation is kept; one row per
/// (level, entity) carries `is_latest`.
pub struct IrrResultRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl IrrResultRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl IrrResultRepositoryTrait for IrrResultRepository {
    async fn record_results(&self, results: &[IrrResult]) -> Result<usize> {
        if results.is_empty() {
            return Ok(0);
        }
        let mut rows: Vec<IrrResultDB> = results.iter().map(IrrResultDB::latest).collect();

        self.writer
            .exec(move |conn| {
                let mut inserted = 0;
                for row in rows.iter_mut() {
                    let current = irr_results::table
                        .filter(irr_results::entity_level.eq(&row.entity_level))
                        .filter(irr_results::entity_id.eq(&row.entity_id))
                        .filter(irr_results::is_latest.eq(true))
                        .select(irr_results::as_of_date)
                        .first::<String>(conn)
                        .optional()
                        .into_core()?;
                    // Dates are stored as YYYY-MM-DD, so text order is date order.
                    row.is_latest = current.map_or(true, |date| row.as_of_date >= date);

                    if row.is_latest {
                        diesel::update(
                            irr_results::table
                                .filter(irr_results::entity_level.eq(&row.entity_level))
                                .filter(irr_results::entity_id.eq(&row.entity_id))
                                .filter(irr_results::is_latest.eq(true)),
                        )
                        .set(irr_results::is_latest.eq(false))
                        .execute(conn)
                        .into_core()?;
                    }

                    inserted += diesel::insert_into(irr_results::table)
                        .values(&*row)
                        .execute(conn)
                        .into_core()?;
                }
                debug!("Recorded {} IRR results", inserted);
                Ok(inserted)
            })
            .await
    }

    fn get_latest_result(&self, level: EntityLevel, entity_id: &str) -> Result<Option<IrrResult>> {
        let mut conn = get_connection(&self.pool)?;
        let row = irr_results::table
            .filter(irr_results::entity_level.eq(level.as_str()))
            .filter(irr_results::entity_id.eq(entity_id))
            .filter(irr_results::is_latest.eq(true))
            .select(IrrResultDB::as_select())
            .first::<IrrResultDB>(&mut conn)
            .optional()
            .into_core()?;
        row.map(IrrResult::try_from)
            .transpose()
            .map_err(Error::from)
    }

    fn get_result_as_of(
        &self,
        level: EntityLevel,
        entity_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<IrrResult>> {
        let mut conn = get_connection(&self.pool)?;
        let row = irr_results::table
            .filter(irr_results::entity_level.eq(level.as_str()))
            .filter(irr_results::entity_id.eq(entity_id))
            .filter(irr_results::as_of_date.eq(format_date(as_of)))
            .order(irr_results::computed_at.desc())
            .select(IrrResultDB::as_select())
            .first::<IrrResultDB>(&mut conn)
            .optional()
            .into_core()?;
        row.map(IrrResult::try_from)
            .transpose()
            .map_err(Error::from)
    }

    fn get_result_history(&self, level: EntityLevel, entity_id: &str) -> Result<Vec<IrrResult>> {
        let mut conn = get_connection(&self.pool)?;
        irr_results::table
            .filter(irr_results::entity_level.eq(level.as_str()))
            .filter(irr_results::entity_id.eq(entity_id))
            .order((irr_results::as_of_date.desc(), irr_results::computed_at.desc()))
            .select(IrrResultDB::as_select())
            .load::<IrrResultDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| IrrResult::try_from(row).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use advisory_core::performance::IrrMethod;
    use rust_decimal_macros::dec;

    fn result(id: &str, as_of: NaiveDate, rate: Option<rust_decimal::Decimal>) -> IrrResult {
        IrrResult {
            id: id.to_string(),
            entity_id: "p1".to_string(),
            entity_level: EntityLevel::Portfolio,
            rate,
            as_of_date: as_of,
            converged: rate.is_some(),
            cash_flow_count: 3,
            iterations: 4,
            method: if rate.is_some() {
                IrrMethod::Newton
            } else {
                IrrMethod::Unsolved
            },
            failure_reason: rate.is_none().then(|| "no sign change".to_string()),
            computed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_newest_result_becomes_latest() {
        let store = test_store();
        let repo = IrrResultRepository::new(Arc::clone(&store.pool), store.writer.clone());
        let as_of = date(2025, 3, 31);

        assert_eq!(repo.record_results(&[result("r1", as_of, Some(dec!(0.05)))]).await.unwrap(), 1);
        repo.record_results(&[result("r2", as_of, None)]).await.unwrap();

        let latest = repo
            .get_latest_result(EntityLevel::Portfolio, "p1")
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "r2");
        assert_eq!(latest.method, IrrMethod::Unsolved);
        assert_eq!(latest.failure_reason.as_deref(), Some("no sign change"));
        assert_eq!(
            repo.get_result_history(EntityLevel::Portfolio, "p1")
                .unwrap()
                .len(),
            2
        );
    }

    fn latest_rows(store: &TestStore) -> Vec<String> {
        irr_results::table
            .filter(irr_results::entity_level.eq(EntityLevel::Portfolio.as_str()))
            .filter(irr_results::entity_id.eq("p1"))
            .filter(irr_results::is_latest.eq(true))
            .select(irr_results::id)
            .load::<String>(&mut get_connection(&store.pool).unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_current_result_across_dates() {
        let store = test_store();
        let repo = IrrResultRepository::new(Arc::clone(&store.pool), store.writer.clone());

        repo.record_results(&[
            result("q4", date(2024, 12, 31), Some(dec!(0.04))),
            result("q1", date(2025, 3, 31), Some(dec!(0.06))),
        ])
        .await
        .unwrap();
        assert_eq!(latest_rows(&store), vec!["q1".to_string()]);

        // An older as-of date is kept but does not take over.
        repo.record_results(&[result("q3", date(2024, 9, 30), Some(dec!(0.03)))])
            .await
            .unwrap();
        assert_eq!(latest_rows(&store), vec!["q1".to_string()]);

        repo.record_results(&[result("q1-rerun", date(2025, 3, 31), Some(dec!(0.07)))])
            .await
            .unwrap();
        assert_eq!(latest_rows(&store), vec!["q1-rerun".to_string()]);

        let q4 = repo
            .get_result_as_of(EntityLevel::Portfolio, "p1", date(2024, 12, 31))
            .unwrap()
            .unwrap();
        assert_eq!(q4.rate, Some(dec!(0.04)));
        assert!(repo
            .get_latest_result(EntityLevel::Client, "p1")
            .unwrap()
            .is_none());
        assert_eq!(
            repo.get_result_history(EntityLevel::Portfolio, "p1").unwrap().len(),
            4
        );
    }
}
