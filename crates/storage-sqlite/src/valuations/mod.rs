//! SQLite storage for fund valuations.

mod model;
mod repository;

pub use model::FundValuationDB;
pub use repository::{
    read_latest_valuations, read_valuations, read_valuations_recorded_since, ValuationRepository,
};
