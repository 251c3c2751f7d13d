//! UTC timestamp formatting for the SQL layer.
//!
//! The textual form `YYYY-MM-DD HH:MM:SS` sorts lexicographically in
//! chronological order, which the range queries rely on.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trip() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();
        let text = format_timestamp(time);
        assert_eq!(text, "2024-03-09 14:30:05");
        assert_eq!(parse_timestamp(&text).unwrap(), time);
    }

    #[test]
    fn lexicographic_order_matches_chronology() {
        let earlier = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
