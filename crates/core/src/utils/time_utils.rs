use chrono::{Datelike, NaiveDate, Utc};

/// Today's date in UTC, the calendar the ledger is recorded in.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Last calendar day of the given quarter (1-4).
pub fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        4 => (12, 31),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a `YYYY-Qn` label into the quarter's end date.
pub fn parse_quarter_label(label: &str) -> Option<NaiveDate> {
    let (year, quarter) = label.trim().split_once('-')?;
    if year.len() != 4 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let quarter = quarter.strip_prefix('Q').or_else(|| quarter.strip_prefix('q'))?;
    let quarter: u32 = quarter.parse().ok()?;
    quarter_end(year, quarter)
}

/// Quarter label (`YYYY-Qn`) containing a date.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

/// Fractional years between two dates on an actual/365 basis.
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / 365.0
}
