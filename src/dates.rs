use crate::error::{FetcherError, Result};
use chrono::NaiveDate;

/// Day-first date format used by the European feeds.
pub const FEED_DATE_FORMAT: &str = "%d/%m/%Y";
/// Canonical storage format.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `DD/MM/YYYY` feed date. Two-digit day and month and a
/// four-digit year are required; chrono alone accepts any year width.
pub fn parse_feed_date(value: &str, line: usize) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let date_error = || FetcherError::DateFormat {
        line,
        value: value.to_string(),
        expected: "DD/MM/YYYY",
    };
    if !has_feed_shape(trimmed) {
        return Err(date_error());
    }
    NaiveDate::parse_from_str(trimmed, FEED_DATE_FORMAT).map_err(|_| date_error())
}

/// `NN/NN/NNNN`
fn has_feed_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'/',
            _ => b.is_ascii_digit(),
        })
}

pub fn to_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// `DD/MM/YYYY` -> `YYYY-MM-DD`
pub fn feed_to_canonical(value: &str, line: usize) -> Result<String> {
    parse_feed_date(value, line).map(to_canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translates_day_first_dates() {
        assert_eq!(feed_to_canonical("15/03/2020", 1).unwrap(), "2020-03-15");
    }

    #[test]
    fn test_rejects_other_formats() {
        let cases = [
            "2020-03-15",
            "03/15/2020",
            "31/02/2020",
            "",
            "yesterday",
            "15/03/20",
            "15/03/02020",
            "5/3/2020",
            "15/03/+2020",
        ];
        for bad in cases {
            let err = feed_to_canonical(bad, 4).unwrap_err();
            assert!(
                matches!(err, FetcherError::DateFormat { line: 4, .. }),
                "expected date error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_round_trip_every_day_2000_to_2099() {
        let mut day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let mut count = 0;
        while day <= last {
            let feed = day.format(FEED_DATE_FORMAT).to_string();
            let canonical = feed_to_canonical(&feed, 1).unwrap();
            let reparsed = NaiveDate::parse_from_str(&canonical, CANONICAL_DATE_FORMAT).unwrap();
            assert_eq!(reparsed.format(FEED_DATE_FORMAT).to_string(), feed);
            day = day.succ_opt().unwrap();
            count += 1;
        }
        assert_eq!(count, 36525);
    }
}
