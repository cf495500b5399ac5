// src/services/schedule.rs

//! Due-time arithmetic.
//!
//! All instants are UTC. Registry timestamps without an offset (Socrata
//! floating timestamps, or naive ISO strings written by earlier tooling) are
//! read as UTC, and [`format_timestamp`] writes naive UTC so that a value read
//! back yields the same instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::services::frequency::ParsedFrequency;

/// Layout used when writing last-ingested timestamps.
const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const OFFSET_LAYOUTS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Accepted forms: RFC 3339, date-time with a `+hhmm` offset, naive
/// date-time (with `T` or a space, optional seconds and fraction, optional
/// `Z` suffix) and a bare date (midnight).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_timestamp(value, "empty timestamp"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, layout) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    // `Z` is UTC, which is how naive values are read anyway.
    let naive_text = trimmed
        .strip_suffix(['Z', 'z'])
        .unwrap_or(trimmed);
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_text, layout) {
            return Ok(naive.and_utc());
        }
    }

    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| AppError::invalid_timestamp(value, "date out of range")),
        Err(e) => Err(AppError::invalid_timestamp(value, e)),
    }
}

/// Format an instant the way the registry stores last-ingested times.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.naive_utc().format(WRITE_FORMAT).to_string()
}

/// Compute the first instant after which a feed may be ingested again.
///
/// Pure: `last_ingested + frequency`, exactly.
pub fn next_eligible_instant(
    last_ingested: &str,
    frequency: &ParsedFrequency,
) -> Result<DateTime<Utc>> {
    let last = parse_timestamp(last_ingested)?;
    last.checked_add_signed(frequency.duration())
        .ok_or_else(|| AppError::invalid_timestamp(last_ingested, "next ingest time out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::frequency::parse;
    use chrono::{TimeDelta, TimeZone};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        let expected = utc(2021, 3, 4, 12, 0, 0);
        assert_eq!(parse_timestamp("2021-03-04T12:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T12:00:00.000").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04 12:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T14:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T12:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2021-03-04").unwrap(),
            utc(2021, 3, 4, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_compact_offsets_and_zulu() {
        let expected = utc(2021, 3, 4, 12, 0, 0);
        assert_eq!(parse_timestamp("2021-03-04T12:00:00+0000").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T14:00:00.000+0200").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04 07:00:00-0500").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T12:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T12:00:00.000Z").unwrap(), expected);
    }

    #[test]
    fn test_parse_microseconds_from_isoformat() {
        let parsed = parse_timestamp("2021-03-04T12:00:00.123456").unwrap();
        assert_eq!(parsed, utc(2021, 3, 4, 12, 0, 0) + TimeDelta::microseconds(123_456));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "   ", "yesterday", "2021-13-01", "12h"] {
            let err = parse_timestamp(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTimestamp, "{bad:?}");
        }
    }

    #[test]
    fn test_format_round_trips() {
        let at = utc(2024, 1, 2, 3, 4, 5) + TimeDelta::milliseconds(678);
        let text = format_timestamp(at);
        assert_eq!(text, "2024-01-02T03:04:05.678");
        assert_eq!(parse_timestamp(&text).unwrap(), at);
    }

    #[test]
    fn test_next_eligible_is_exact_sum() {
        let cases = [
            ("2021-03-04T12:00:00.000", "12h"),
            ("2021-03-04T23:59:59.999", "5m"),
            ("2020-02-28T23:59:30", "30s"),
            ("2021-12-31T20:00:00Z", "100h"),
        ];
        for (ts, freq) in cases {
            let freq = parse(freq).unwrap();
            let next = next_eligible_instant(ts, &freq).unwrap();
            assert_eq!(next, parse_timestamp(ts).unwrap() + freq.duration());
        }
    }

    #[test]
    fn test_next_eligible_crosses_leap_day() {
        let next = next_eligible_instant("2020-02-28T23:59:30", &parse("30s").unwrap()).unwrap();
        assert_eq!(next, utc(2020, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_next_eligible_rejects_bad_timestamp() {
        let err = next_eligible_instant("not a time", &parse("1h").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimestamp);
    }
}
