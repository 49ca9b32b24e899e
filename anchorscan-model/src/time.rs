//! Server clock format: `yyyy-MM-dd HH:mm:ss`, UTC, no zone suffix.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ModelError;

pub const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_server_time(raw: &str) -> Result<DateTime<Utc>, ModelError> {
    NaiveDateTime::parse_from_str(raw.trim(), SERVER_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| ModelError::InvalidTimestamp {
            raw: raw.to_string(),
            reason: err.to_string(),
        })
}

pub fn format_server_time(at: DateTime<Utc>) -> String {
    at.format(SERVER_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_server_format_as_utc() {
        let parsed = parse_server_time("2024-03-09 17:04:05").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap());
        assert_eq!(format_server_time(parsed), "2024-03-09 17:04:05");
    }

    #[test]
    fn rejects_iso_and_garbage() {
        assert!(parse_server_time("2024-03-09T17:04:05Z").is_err());
        assert!(parse_server_time("").is_err());
        assert!(parse_server_time("yesterday").is_err());
    }
}
