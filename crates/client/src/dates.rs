//! Best-effort date parsing for forum timestamps.
//!
//! Forums print dates in whatever shape their theme likes. Everything here
//! returns `Option`: a date that cannot be read is never an error, the
//! caller stores an empty string instead.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%b %d, %Y at %I:%M %p",
    "%B %d, %Y at %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y, %I:%M:%S %p",
    "%B %d, %Y, %I:%M %p",
    "%B %d, %Y %I:%M:%S %p",
    "%m-%d-%Y, %I:%M %p",
    "%m-%d-%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y, %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m-%d-%Y", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %B %Y"];

const TIME_FORMATS: &[&str] = &["%I:%M %p", "%I:%M:%S %p", "%H:%M:%S", "%H:%M"];

/// Format as ISO-8601 without fractional seconds or offset.
pub fn iso(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn normalize(input: &str) -> String {
    input.replace('\u{a0}', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a human-readable timestamp in any of the shapes forums commonly use.
pub fn parse_loose(input: &str) -> Option<NaiveDateTime> {
    let input = normalize(input);
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&input) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&input) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&input, fmt).ok())
        .or_else(|| parse_day(&input).and_then(|day| day.and_hms_opt(0, 0, 0)))
}

/// Parse a calendar date with no time component.
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = normalize(input);
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(&input, fmt).ok())
}

/// Parse a time of day such as `03:04 PM` or `15:04`.
pub fn parse_time_of_day(input: &str) -> Option<NaiveTime> {
    let input = normalize(input);
    TIME_FORMATS.iter().find_map(|fmt| NaiveTime::parse_from_str(&input, fmt).ok())
}

/// Combine a day label and a time of day into an absolute timestamp.
///
/// `Today` and `Yesterday` are taken relative to `now`; any other label must
/// be a calendar date.
pub fn resolve_relative(day: &str, time: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = parse_time_of_day(time)?;
    match normalize(day).as_str() {
        "Today" => Some(now.date().and_time(time)),
        "Yesterday" => now.date().and_time(time).checked_sub_days(Days::new(1)),
        other => parse_day(other).map(|date| date.and_time(time)),
    }
}

/// Seconds since the Unix epoch, as UTC.
pub fn from_unix(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_iso_format() {
        assert_eq!(iso(at("2014-01-05T15:04:00")), "2014-01-05T15:04:00");
    }

    #[test]
    fn test_parse_loose_xenforo_title() {
        assert_eq!(parse_loose("Jan 5, 2014 at 3:04 PM"), Some(at("2014-01-05T15:04:00")));
    }

    #[test]
    fn test_parse_loose_smf() {
        assert_eq!(parse_loose("January 05, 2014, 03:04:05 PM"), Some(at("2014-01-05T15:04:05")));
    }

    #[test]
    fn test_parse_loose_vbulletin() {
        assert_eq!(parse_loose("01-05-2014,\u{a0}03:04 PM"), Some(at("2014-01-05T15:04:00")));
    }

    #[test]
    fn test_parse_loose_rfc3339() {
        assert_eq!(parse_loose("2014-01-05T15:04:05+00:00"), Some(at("2014-01-05T15:04:05")));
    }

    #[test]
    fn test_parse_loose_date_only() {
        assert_eq!(parse_loose("2014-01-05"), Some(at("2014-01-05T00:00:00")));
    }

    #[test]
    fn test_parse_loose_garbage() {
        assert_eq!(parse_loose("a while ago"), None);
        assert_eq!(parse_loose("   "), None);
    }

    #[test]
    fn test_resolve_yesterday() {
        let now = at("2024-01-02T00:00:00");
        assert_eq!(resolve_relative("Yesterday", "03:04 PM", now), Some(at("2024-01-01T15:04:00")));
    }

    #[test]
    fn test_resolve_today() {
        let now = at("2024-01-02T09:30:00");
        assert_eq!(resolve_relative("Today", "08:15 AM", now), Some(at("2024-01-02T08:15:00")));
    }

    #[test]
    fn test_resolve_absolute_day() {
        let now = at("2024-01-02T00:00:00");
        assert_eq!(resolve_relative("12-25-2013", "11:00 PM", now), Some(at("2013-12-25T23:00:00")));
    }

    #[test]
    fn test_resolve_bad_time() {
        let now = at("2024-01-02T00:00:00");
        assert_eq!(resolve_relative("Today", "noonish", now), None);
    }

    #[test]
    fn test_from_unix() {
        assert_eq!(from_unix(1_388_934_245), Some(at("2014-01-05T15:04:05")));
    }
}
