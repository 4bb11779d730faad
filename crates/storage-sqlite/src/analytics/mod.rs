//! Snapshot source and change feed backing the analytics engine.

mod source;


pub use source::SqliteAnalyticsSource;
