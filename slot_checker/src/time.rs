//! Wall-clock helpers for minute-precision schedule times.
//!
//! Grid times never cross midnight, so arithmetic here is bounded to a single
//! day: stepping past 23:59 or before 00:00 yields `None` instead of wrapping.

use chrono::{NaiveTime, Timelike};

/// Minutes since midnight.
pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Build a time from minutes since midnight, `None` outside `0..1440`.
pub fn from_minutes(minutes: i64) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&minutes) {
        return None;
    }
    NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
}

/// Offset a time by a signed number of minutes without wrapping around midnight.
pub fn offset_minutes(time: NaiveTime, delta: i64) -> Option<NaiveTime> {
    from_minutes(minutes_of_day(time) as i64 + delta)
}

/// Render a time the way clinic staff read it on the booking grid (`9:05`, `14:30`).
pub fn format_clock(time: NaiveTime) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

/// Serde adapter for `HH:MM` strings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_minutes_roundtrip() {
        assert_eq!(minutes_of_day(t(9, 25)), 565);
        assert_eq!(from_minutes(565), Some(t(9, 25)));
    }

    #[test]
    fn test_offset_does_not_wrap() {
        assert_eq!(offset_minutes(t(23, 55), 5), None);
        assert_eq!(offset_minutes(t(0, 5), -10), None);
        assert_eq!(offset_minutes(t(12, 0), -15), Some(t(11, 45)));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(t(9, 5)), "9:05");
        assert_eq!(format_clock(t(14, 30)), "14:30");
    }
}
