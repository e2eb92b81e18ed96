//! Timestamp utilities for records, artifacts and dataset date columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// # Examples
///
/// ```
/// use insightflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Formats a timestamp as ISO 8601 string.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Parses the date part of a dataset cell.
///
/// Accepts ISO dates and datetimes plus the common human-readable forms
/// found in exported spreadsheets. Returns `None` for anything else, the
/// same way a coercing date parser would produce a null.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&trimmed.replace('Z', "+00:00")) {
        return Some(dt.date_naive());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.date());
        }
    }

    const DATE_FORMATS: [&str; 7] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d.%m.%Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%d %b %Y",
    ];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_iso_date() {
        let date = parse_date("2023-10-05").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2023, 10, 5));
    }

    #[test]
    fn test_parse_datetime_and_rfc3339() {
        assert_eq!(parse_date("2023-10-05 14:30:00"), NaiveDate::from_ymd_opt(2023, 10, 5));
        assert_eq!(parse_date("2023-10-05T14:30:00Z"), NaiveDate::from_ymd_opt(2023, 10, 5));
    }

    #[test]
    fn test_parse_human_readable() {
        assert_eq!(parse_date("Oct 5, 2023"), NaiveDate::from_ymd_opt(2023, 10, 5));
        assert_eq!(parse_date("10/05/2023"), NaiveDate::from_ymd_opt(2023, 10, 5));
    }

    #[test]
    fn test_parse_invalid_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
