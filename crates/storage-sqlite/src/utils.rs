//! Helpers shared by the repositories: parameter chunking and the text
//! encodings used for dates, timestamps and decimals.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite `IN (...)` queries.
///
/// SQLite's compile-time variable limit is typically 999; 500 leaves room
/// for the other parameters of a query.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Timestamps are stored with a fixed width so text order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Splits a slice into chunks that fit in one `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp. RFC 3339 values written by other tools are
/// accepted too.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc)))
        .map_err(|e| StorageError::Decode(format!("timestamp '{}': {}", raw, e)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StorageError::Decode(format!("date '{}': {}", raw, e)))
}

pub fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| StorageError::Decode(format!("{} '{}': {}", field, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chunk_for_sqlite() {
        let empty: Vec<i32> = vec![];
        assert_eq!(chunk_for_sqlite(&empty).count(), 0);

        let items: Vec<i32> = (0..SQLITE_MAX_PARAMS_CHUNK as i32 + 1).collect();
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), SQLITE_MAX_PARAMS_CHUNK);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::microseconds(1);

        let (a, b) = (format_timestamp(early), format_timestamp(late));
        assert!(a < b);
        assert_eq!(a, "2025-01-02T03:04:05.000000Z");
        assert_eq!(parse_timestamp(&b).unwrap(), late);
    }

    #[test]
    fn test_parse_timestamp_accepts_rfc3339() {
        let parsed = parse_timestamp("2025-01-02T03:04:05+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 2, 2, 4, 5).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_dates_and_decimals() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date(&format_date(date)).unwrap(), date);
        assert!(parse_date("2024-02-30").is_err());
        assert_eq!(parse_decimal(" 12.50 ", "amount").unwrap(), Decimal::new(1250, 2));
        assert!(parse_decimal("12,5", "amount").is_err());
    }
}
