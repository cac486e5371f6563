//! Funding date parsing

use chrono::{DateTime, NaiveDate};

/// Accepted layouts, tried in order. US month-first wins over day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a date in any of the accepted layouts, or an RFC 3339 / RFC 2822
/// timestamp (time part discarded).
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc2822(text) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        // "2024-01-15 09:30" and similar
        .or_else(|| {
            text.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_accepted_formats() {
        assert_eq!(parse_date("2024-01-15"), ymd(2024, 1, 15));
        assert_eq!(parse_date("2024-01-15T14:00:00Z"), ymd(2024, 1, 15));
        assert_eq!(parse_date("2024-01-15T14:00:00-08:00"), ymd(2024, 1, 15));
        assert_eq!(parse_date("01/28/2024"), ymd(2024, 1, 28));
        assert_eq!(parse_date("01-28-2024"), ymd(2024, 1, 28));
        assert_eq!(parse_date("January 15, 2024"), ymd(2024, 1, 15));
        assert_eq!(parse_date("Jan 25, 2024"), ymd(2024, 1, 25));
        assert_eq!(parse_date("20 January 2024"), ymd(2024, 1, 20));
        assert_eq!(parse_date("2024-01-15 09:30"), ymd(2024, 1, 15));
        assert_eq!(parse_date("Mon, 15 Jan 2024 10:00:00 +0000"), ymd(2024, 1, 15));
    }

    #[test]
    fn test_month_first_is_preferred() {
        assert_eq!(parse_date("03/04/2024"), ymd(2024, 3, 4));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("last week"), None);
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date("Q1 2024"), None);
    }
}
