//! Clock-time arithmetic for the booking engine.
//!
//! Slots and bookings are defined in the service's local wall-clock time,
//! so all range math happens on minute offsets since midnight rather than
//! on instants. Pure functions, no side effects.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{FormatError, Result};

/// Minutes in a day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Parse `HH:MM` into minutes since midnight.
pub fn to_minutes(time: &str) -> Result<u16> {
    let err = || FormatError::Time(time.to_string());

    let (hh, mm) = time.split_once(':').ok_or_else(err)?;
    if hh.len() != 2 || mm.len() != 2 {
        return Err(err().into());
    }
    // u16::parse accepts a leading '+', so digits only.
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err().into());
    }

    let hours: u16 = hh.parse().map_err(|_| err())?;
    let minutes: u16 = mm.parse().map_err(|_| err())?;
    if hours > 23 || minutes > 59 {
        return Err(err().into());
    }

    Ok(hours * 60 + minutes)
}

/// Render minutes since midnight as a zero-padded `HH:MM` string.
pub fn to_time(minutes: u16) -> Result<String> {
    if minutes >= MINUTES_PER_DAY {
        return Err(FormatError::MinuteOffset(minutes as u32).into());
    }
    Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

/// Duration in minutes from `start` to `end` (both minute offsets).
///
/// When `end < start` the range is assumed to wrap past midnight.
pub fn duration_minutes(start: u16, end: u16) -> u16 {
    if end >= start {
        end - start
    } else {
        (MINUTES_PER_DAY - start) + end
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| FormatError::Date(date.to_string()).into())
}

/// Current wall-clock time of the service, given its fixed UTC offset.
///
/// The generator and the availability query both go through this helper so
/// near-boundary slots are filtered consistently.
pub fn local_now(utc_offset_minutes: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::minutes(utc_offset_minutes as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(to_minutes("00:00").unwrap(), 0);
        assert_eq!(to_minutes("08:30").unwrap(), 510);
        assert_eq!(to_minutes("23:59").unwrap(), 1439);
    }

    #[test]
    fn test_to_minutes_rejects_malformed() {
        for bad in [
            "24:00", "12:60", "9:00", "09:0", "0900", "ab:cd", "", ":", "+1:30", "-1:30",
        ] {
            assert!(to_minutes(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_to_time_zero_padded() {
        assert_eq!(to_time(0).unwrap(), "00:00");
        assert_eq!(to_time(510).unwrap(), "08:30");
        assert_eq!(to_time(1439).unwrap(), "23:59");
        assert!(to_time(1440).is_err());
    }

    #[test]
    fn test_round_trip_all_valid_minutes() {
        for m in 0..MINUTES_PER_DAY {
            assert_eq!(to_minutes(&to_time(m).unwrap()).unwrap(), m);
        }
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration_minutes(600, 660), 60);
        assert_eq!(duration_minutes(600, 600), 0);
    }

    #[test]
    fn test_duration_wraps_past_midnight() {
        // 23:00 -> 01:00
        assert_eq!(duration_minutes(1380, 60), 120);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-11-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
        assert!(parse_date("01/11/2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
