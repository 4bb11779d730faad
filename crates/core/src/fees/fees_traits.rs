use chrono::{DateTime, Utc};

use super::FeeConfiguration;
use crate::errors::Result;

/// Read-only access to current fee configuration.
pub trait FeeConfigurationReaderTrait: Send + Sync {
    /// Current configuration of the given products, or of every product
    /// when `product_ids` is `None`.
    fn get_fee_configurations(&self, product_ids: Option<&[String]>)
        -> Result<Vec<FeeConfiguration>>;

    /// Configurations whose `updated_at` is strictly after `since`.
    fn get_fee_configurations_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeeConfiguration>>;
}
