//! SQLite storage for product fee configuration.

mod model;
mod repository;

pub use model::FeeConfigurationDB;
pub use repository::{read_fee_configurations, read_fee_changes, FeeConfigurationRepository};
