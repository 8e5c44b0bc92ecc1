//! Tolerant ISO-8601 parsing for temporal result cells.
//!
//! Accepts `T` or a space between date and time, optional fractional
//! seconds and a trailing `Z`, `+HH`, `+HHMM` or `+HH:MM` offset.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse a time of day without offset.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Parse a timestamp without offset. A bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Parse a timestamp with optional offset, normalized to UTC.
///
/// Values without an offset are taken to be UTC.
pub fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    // The date part contains '-', so only look for an offset after it.
    let date_end = s.char_indices().nth(10).map_or(s.len(), |(i, _)| i);
    let (body, offset) = split_offset(s, date_end)?;
    let naive = parse_timestamp(body)?;
    match offset {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Parse a time of day with optional offset, normalized to UTC.
///
/// Wraps around midnight, so `01:00:00+09` becomes `16:00:00`.
pub fn parse_timetz(s: &str) -> Option<NaiveTime> {
    let (body, offset) = split_offset(s.trim(), 0)?;
    let time = parse_time(body)?;
    let shift = offset.map_or(0, |o| i64::from(o.local_minus_utc()));
    Some(time.overflowing_sub_signed(Duration::seconds(shift)).0)
}

/// Split a trailing UTC offset from `s`, searching from byte `from`.
///
/// Returns `None` when an offset is present but malformed.
fn split_offset(s: &str, from: usize) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return Some((body, FixedOffset::east_opt(0)));
    }

    let Some(pos) = s[from..].rfind(|c: char| c == '+' || c == '-').map(|p| p + from) else {
        return Some((s, None));
    };

    let sign = if s[pos..].starts_with('-') { -1 } else { 1 };
    let digits: String = s[pos + 1..].chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((s[..pos].trim_end(), Some(offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_timestamp_separators() {
        let expected = NaiveDate::from_ymd_opt(2021, 7, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2021-07-02 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-07-02T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-07-02T10:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2021-07-02"),
            NaiveDate::from_ymd_opt(2021, 7, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_timestamp_fraction() {
        let parsed = parse_timestamp("2021-07-02 10:00:00.123456").unwrap();
        assert_eq!(parsed.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_timestamptz_offsets() {
        let expected = utc("2021-07-02T10:00:00Z");
        assert_eq!(parse_timestamptz("2021-07-02 10:00:00+00"), Some(expected));
        assert_eq!(parse_timestamptz("2021-07-02 19:00:00+0900"), Some(expected));
        assert_eq!(parse_timestamptz("2021-07-02 19:00:00+09:00"), Some(expected));
        assert_eq!(parse_timestamptz("2021-07-02 05:00:00-05"), Some(expected));
        assert_eq!(parse_timestamptz("2021-07-02T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamptz("2021-07-02 10:00:00"), Some(expected));
        assert!(parse_timestamptz("2021-07-02 10:00:00+9x").is_none());
    }

    #[test]
    fn test_parse_timetz_normalizes_to_utc() {
        assert_eq!(parse_timetz("10:00:00+00"), NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(parse_timetz("19:00:00+09"), NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(parse_timetz("01:00:00+09"), NaiveTime::from_hms_opt(16, 0, 0));
        assert_eq!(parse_timetz("10:00:00"), NaiveTime::from_hms_opt(10, 0, 0));
    }

    #[test]
    fn test_parse_date_and_time() {
        assert_eq!(parse_date("2008-01-05"), NaiveDate::from_ymd_opt(2008, 1, 5));
        assert!(parse_date("2008-13-05").is_none());
        assert_eq!(parse_time("23:59:59.5").unwrap().format("%H:%M:%S%.f").to_string(), "23:59:59.500");
    }
}
