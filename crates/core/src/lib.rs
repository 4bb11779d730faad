//! Advisory Core - Domain entities, analytics engine, and traits.
//!
//! This crate contains the valuation, revenue and performance analytics of
//! the advisory back office. It is database-agnostic and defines traits that
//! are implemented by the `storage-sqlite` crate.

pub mod activities;
pub mod analytics;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod events;
pub mod fees;
pub mod performance;
pub mod utils;
pub mod valuations;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
