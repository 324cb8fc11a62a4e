//! Shared time helpers for the schedule ↔ forecast join.
//!
//! The schedule layer and the weather layer meet on a plain string key:
//! `date` + `"T"` + `time`, exactly as both sides produce it. Formatting must
//! stay byte-identical on both sides or the join silently misses, so the key
//! construction lives here and nowhere else.
//!
//! Two upstream time shapes are handled:
//! - schedule session times: `"2025-05-04"` + `"13:00:00Z"` (time optional)
//! - hourly forecast slots: `"2025-05-04T13:00"` (GMT, no seconds, no zone)

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

/// Build the opaque lookup key for a session timestamp.
///
/// This is the exact string the weather map is keyed by; consumers look
/// entries up with the same concatenation, not with parsed times.
pub(crate) fn session_time_key(date: &str, time: &str) -> String {
    format!("{}T{}", date, time)
}

/// Parse a schedule (date, time) pair into a UTC instant.
///
/// Schedule times are UTC with a trailing `Z` (`"13:00:00Z"`); the `Z` is
/// tolerated but not required, and seconds may be omitted. A missing time
/// means "date only" and resolves to midnight UTC.
pub(crate) fn parse_session_datetime(date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = match time {
        Some(t) => parse_session_time(t)?,
        None => NaiveTime::MIN,
    };
    Some(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
}

fn parse_session_time(s: &str) -> Option<NaiveTime> {
    let trimmed = s.trim_end_matches('Z');
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

/// Parse an hourly forecast slot (`"2025-05-04T13:00"`).
///
/// The forecast API also emits seconds in some configurations, so both
/// shapes are accepted.
pub(crate) fn parse_hour_slot(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Hour-exact match: same UTC calendar year/month/day/hour.
///
/// No tolerance window and no interpolation — forecast granularity is hourly
/// and sessions start on the hour or half-hour, so the containing hour is the
/// only sensible sample.
pub(crate) fn same_utc_hour(session: DateTime<Utc>, slot: NaiveDateTime) -> bool {
    session.date_naive() == slot.date() && session.time().hour() == slot.time().hour()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_time_key_concatenation() {
        assert_eq!(
            session_time_key("2025-05-04", "13:00:00Z"),
            "2025-05-04T13:00:00Z"
        );
    }

    #[test]
    fn test_parse_session_datetime_with_zulu() {
        let dt = parse_session_datetime("2025-05-04", Some("13:00:00Z")).unwrap();
        assert_eq!(dt, "2025-05-04T13:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_session_datetime_without_zone() {
        let dt = parse_session_datetime("2025-05-04", Some("13:00:00")).unwrap();
        assert_eq!(dt, "2025-05-04T13:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_session_datetime_minutes_only() {
        let dt = parse_session_datetime("2025-05-04", Some("13:30")).unwrap();
        assert_eq!(dt, "2025-05-04T13:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_session_datetime_date_only() {
        let dt = parse_session_datetime("2025-05-04", None).unwrap();
        assert_eq!(dt, "2025-05-04T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_session_datetime_garbage() {
        assert!(parse_session_datetime("not-a-date", Some("13:00:00Z")).is_none());
        assert!(parse_session_datetime("2025-05-04", Some("late")).is_none());
    }

    #[test]
    fn test_parse_hour_slot() {
        let slot = parse_hour_slot("2025-05-04T14:00").unwrap();
        assert_eq!(slot.to_string(), "2025-05-04 14:00:00");
    }

    #[test]
    fn test_parse_hour_slot_with_seconds() {
        assert!(parse_hour_slot("2025-05-04T14:00:00").is_some());
    }

    #[test]
    fn test_same_utc_hour_within_hour() {
        let session = "2025-05-04T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let slot = parse_hour_slot("2025-05-04T14:00").unwrap();
        assert!(same_utc_hour(session, slot));
    }

    #[test]
    fn test_same_utc_hour_adjacent_hour() {
        let session = "2025-05-04T15:01:00Z".parse::<DateTime<Utc>>().unwrap();
        let slot = parse_hour_slot("2025-05-04T14:00").unwrap();
        assert!(!same_utc_hour(session, slot));
    }

    #[test]
    fn test_same_utc_hour_different_day() {
        let session = "2025-05-05T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let slot = parse_hour_slot("2025-05-04T14:00").unwrap();
        assert!(!same_utc_hour(session, slot));
    }
}
