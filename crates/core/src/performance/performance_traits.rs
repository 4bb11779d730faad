//! Persistence trait for computed IRR results.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{EntityLevel, IrrResult};
use crate::errors::Result;

/// Storage of IRR results. Results are appended; each entity has exactly
/// one current result, the one with the latest as-of date (the newest
/// computation breaks ties).
#[async_trait]
pub trait IrrResultRepositoryTrait: Send + Sync {
    /// Appends results. A result becomes current unless the entity already
    /// has a current result for a later as-of date.
    async fn record_results(&self, results: &[IrrResult]) -> Result<usize>;

    /// The current result of an entity.
    fn get_latest_result(
        &self,
        entity_level: EntityLevel,
        entity_id: &str,
    ) -> Result<Option<IrrResult>>;

    /// The newest computation for one as-of date.
    fn get_result_as_of(
        &self,
        entity_level: EntityLevel,
        entity_id: &str,
        as_of_date: NaiveDate,
    ) -> Result<Option<IrrResult>>;

    /// All stored results of an entity, newest computation first.
    fn get_result_history(
        &self,
        entity_level: EntityLevel,
        entity_id: &str,
    ) -> Result<Vec<IrrResult>>;
}
