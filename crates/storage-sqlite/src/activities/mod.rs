//! SQLite storage for the activity ledger.

mod model;
mod repository;

pub use model::ActivityEventDB;
pub use repository::{read_activities, read_activities_recorded_since, ActivityRepository};
