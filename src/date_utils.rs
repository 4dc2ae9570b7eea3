//! Multi-format date parsing, ISO emission, and staleness testing (C2, §4.1 notes).
//!
//! Grounded on `original_source/scraper/app/utils/date_utils.py`. Tries each of
//! `INDIAN_DATE_FORMATS` in order, then falls back to ISO 8601 (via `DateTime::parse_from_rfc3339`
//! and a bare `NaiveDate` parse), matching the original's format-list-then-`fromisoformat` order.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::core::constants::INDIAN_DATE_FORMATS;

/// Parse a date string, trying the configured Indian date formats before ISO 8601.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let text = value.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in INDIAN_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(d);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc().date());
    }

    None
}

/// `YYYY-MM-DD`, or an empty string if `date` is `None`.
pub fn to_iso_string(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn today_iso() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Whether `at` (interpreted as UTC) falls within the last `hours` hours of now.
pub fn is_recent(at: DateTime<Utc>, hours: i64) -> bool {
    Utc::now() - at < Duration::hours(hours)
}

/// Format a date for display; default matches the original's Indian `DD-MM-YYYY`.
pub fn format_date(date: NaiveDate, fmt: &str) -> String {
    date.format(fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_supported_format() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        for input in [
            "01-02-2024",
            "01/02/2024",
            "01-Feb-2024",
            "01 Feb 2024",
            "2024-02-01",
            "01.02.2024",
            "01-02-24",
            "01/02/24",
        ] {
            assert_eq!(parse_date(input), Some(expected), "failed on {input}");
        }
    }

    #[test]
    fn round_trip_produces_iso_date_pattern() {
        for input in ["01-02-2024", "2024-02-01"] {
            let parsed = parse_date(input).expect("should parse");
            let iso = to_iso_string(Some(parsed));
            assert_eq!(iso.len(), 10);
            assert_eq!(iso, "2024-02-01");
        }
    }

    #[test]
    fn unparseable_date_returns_none() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn is_recent_respects_threshold() {
        let now = Utc::now();
        assert!(is_recent(now, 48));
        assert!(!is_recent(now - Duration::hours(50), 48));
    }
}
