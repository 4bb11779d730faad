//! SQLite storage implementation for the advisory analytics engine.
//!
//! This crate is the only place Diesel appears. It implements the reader
//! and repository traits defined in `advisory-core` and contains:
//! - Connection pooling, PRAGMAs and the single-writer actor
//! - The embedded schema migration
//! - Readers for the entity graph, activity ledger, valuations and fees
//! - The IRR result store
//! - The snapshot source and change feed used by the analytics cache
//!
//! ```text
//! advisory-core (domain, traits)
//!          │
//!          ▼
//! advisory-storage-sqlite (this crate)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

pub mod activities;
pub mod analytics;
pub mod entities;
pub mod fees;
pub mod performance;
pub mod valuations;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::{
    create_pool, get_connection, get_db_path, init, open, run_migrations, spawn_writer,
    DbConnection, DbPool, WriteHandle,
};
pub use errors::{IntoCore, StorageError};

pub use activities::ActivityRepository;
pub use analytics::SqliteAnalyticsSource;
pub use entities::EntityRepository;
pub use fees::FeeConfigurationRepository;
pub use performance::IrrResultRepository;
pub use valuations::ValuationRepository;

pub use advisory_core::errors::{DatabaseError, Error, Result};
