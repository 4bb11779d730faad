//! Core error types for the analytics engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use std::sync::Arc;

use chrono::{NaiveDate, ParseError as ChronoParseError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the analytics engine.
///
/// Per-entity failures (`Classification`, `NonConvergence`, `StaleInput`) are
/// normally caught by the calculators and turned into excluded-entity records.
/// They only surface through this type when the failing entity is the one
/// being reported on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cash-flow classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("IRR did not converge: {0}")]
    NonConvergence(#[from] NonConvergenceError),

    #[error("Input data missing: {0}")]
    StaleInput(#[from] StaleInputError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Malformed or ambiguous activity data.
///
/// Fatal to the computation of the entity the event belongs to, never to its
/// siblings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Switch event {event_id} on holding {holding_id} has no related fund")]
    MissingRelatedFund { event_id: String, holding_id: String },

    #[error("Switch event {event_id} on holding {holding_id} references {related_fund_id}, which is not in the same portfolio")]
    RelatedFundOutsidePortfolio {
        event_id: String,
        holding_id: String,
        related_fund_id: String,
    },

    #[error("Switch event {event_id} on holding {holding_id} references its own holding")]
    SelfReferencingSwitch { event_id: String, holding_id: String },

    #[error("Event {event_id} references unknown holding {holding_id}")]
    UnknownHolding { event_id: String, holding_id: String },

    #[error("Event {event_id} of type {activity_type} has a negative amount")]
    NegativeAmount {
        event_id: String,
        activity_type: String,
    },
}

/// The IRR solver could not produce a rate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NonConvergenceError {
    #[error("At least two cash flows are required, got {count}")]
    InsufficientCashFlows { count: usize },

    #[error("Cash flows never change sign; no real rate exists")]
    NoSignChange,

    #[error("No root between {min_rate} and {max_rate}")]
    NoRootInDomain { min_rate: f64, max_rate: f64 },

    #[error("Iteration limit of {iterations} reached (residual {residual})")]
    IterationLimit { iterations: u32, residual: f64 },
}

/// Fee or valuation data missing entirely for an entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StaleInputError {
    #[error("No valuation on or before {as_of} for holding {holding_id}")]
    MissingValuation { holding_id: String, as_of: NaiveDate },

    #[error("No fee configuration for product {product_id}")]
    MissingFeeConfiguration { product_id: String },
}

/// A cache refresh computation failed. The entry keeps its last good payload.
#[derive(Error, Debug, Clone)]
#[error("Refresh of '{key}' failed: {message}")]
pub struct CacheRefreshFailure {
    pub key: String,
    pub message: String,
    /// The error the computation returned.
    pub cause: Arc<Error>,
}

impl CacheRefreshFailure {
    pub fn new(key: impl Into<String>, cause: Error) -> Self {
        Self {
            key: key.into(),
            message: cause.to_string(),
            cause: Arc::new(cause),
        }
    }

    /// The error to hand a caller that had nothing cached to fall back on.
    ///
    /// Request and per-entity errors keep their type; anything else means
    /// the report could not be produced at all.
    pub fn to_error(&self) -> Error {
        match self.cause.as_ref() {
            Error::Analytics(AnalyticsError::UnknownEntity { level, id }) => {
                AnalyticsError::UnknownEntity {
                    level: level.clone(),
                    id: id.clone(),
                }
                .into()
            }
            Error::Analytics(AnalyticsError::InvalidScope { report, scope }) => {
                AnalyticsError::InvalidScope {
                    report: report.clone(),
                    scope: scope.clone(),
                }
                .into()
            }
            Error::Classification(err) => err.clone().into(),
            Error::NonConvergence(err) => err.clone().into(),
            Error::StaleInput(err) => err.clone().into(),
            _ => AnalyticsError::NoDataAvailable {
                key: self.key.clone(),
                reason: self.message.clone(),
            }
            .into(),
        }
    }
}

/// Errors raised by the analytics cache and query façade.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Unknown report '{0}'")]
    UnknownReport(String),

    #[error("Invalid scope '{scope}' for report {report}")]
    InvalidScope { report: String, scope: String },

    #[error("Unknown {level} '{id}'")]
    UnknownEntity { level: String, id: String },

    #[error("{0}")]
    RefreshFailed(#[from] CacheRefreshFailure),

    #[error("No analytics have been computed for '{key}': {reason}")]
    NoDataAvailable { key: String, reason: String },
}

impl Error {
    /// Errors caused by what the caller asked for, not by the data or the
    /// system. These say nothing about refresh health.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Analytics(
                    AnalyticsError::UnknownReport(_)
                        | AnalyticsError::InvalidScope { .. }
                        | AnalyticsError::UnknownEntity { .. }
                )
        )
    }
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<CacheRefreshFailure> for Error {
    fn from(err: CacheRefreshFailure) -> Self {
        Error::Analytics(AnalyticsError::RefreshFailed(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
