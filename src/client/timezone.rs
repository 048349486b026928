//! Conversion between the display zone and UTC.
//!
//! Editable values use a fixed `yyyy-MM-ddTHH:mm` pattern (what an HTML
//! `datetime-local` input produces). Parsing is strict and never errors,
//! anything that doesn't match simply has no instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

const PLACEHOLDER: &str = "--";

/// The closed set of zones events can be viewed and edited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Chicago,
    Kolkata,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported display zone: {0}")]
pub struct UnsupportedZone(pub String);

impl DisplayZone {
    pub const ALL: [DisplayZone; 2] = [DisplayZone::Chicago, DisplayZone::Kolkata];

    pub fn tz(&self) -> Tz {
        match self {
            DisplayZone::Chicago => chrono_tz::America::Chicago,
            DisplayZone::Kolkata => chrono_tz::Asia::Kolkata,
        }
    }

    /// IANA name
    pub fn name(&self) -> &'static str {
        match self {
            DisplayZone::Chicago => "America/Chicago",
            DisplayZone::Kolkata => "Asia/Kolkata",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayZone::Chicago => "America/Chicago (CST/CDT)",
            DisplayZone::Kolkata => "Asia/Kolkata (IST)",
        }
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DisplayZone {
    type Err = UnsupportedZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayZone::ALL
            .into_iter()
            .find(|zone| zone.name() == s)
            .ok_or_else(|| UnsupportedZone(s.to_string()))
    }
}

// chrono accepts single digit fields and signs, the input pattern doesn't
fn matches_pattern(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 16 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 => *b == b':',
        _ => b.is_ascii_digit(),
    })
}

/// Render an instant as an editable value in the zone.
pub fn to_input_value(instant: DateTime<Utc>, zone: DisplayZone) -> String {
    instant
        .with_timezone(&zone.tz())
        .format(INPUT_FORMAT)
        .to_string()
}

/// Interpret an editable value in the zone. Wall-clock times skipped by a
/// DST transition move forward by the gap, repeated ones take the earlier
/// instant.
pub fn from_input_value(value: &str, zone: DisplayZone) -> Option<DateTime<Utc>> {
    if !matches_pattern(value) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(value, INPUT_FORMAT).ok()?;
    let tz = zone.tz();
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest()?,
    };
    Some(local.with_timezone(&Utc))
}

/// Interpret an editable value and render it as a UTC ISO-8601 string.
pub fn to_utc_iso(value: &str, zone: DisplayZone) -> Option<String> {
    from_input_value(value, zone).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Hours between the two values with one decimal, e.g. `1.5h`.
pub fn duration_preview(start: &str, end: &str, zone: DisplayZone) -> String {
    match (from_input_value(start, zone), from_input_value(end, zone)) {
        (Some(start), Some(end)) => {
            let hours = (end - start).num_minutes() as f64 / 60.0;
            format!("{:.1}h", hours)
        }
        _ => PLACEHOLDER.to_string(),
    }
}

/// The start value as it reads in UTC, e.g. `Jun 01, 5:30 PM`.
pub fn utc_preview(start: &str, zone: DisplayZone) -> String {
    match from_input_value(start, zone) {
        Some(instant) => instant.format("%b %d, %-I:%M %p").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_to_input_value_known_offsets() {
        let instant = utc("2024-06-01T17:30:00Z");
        assert_eq!(to_input_value(instant, DisplayZone::Chicago), "2024-06-01T12:30");
        assert_eq!(to_input_value(instant, DisplayZone::Kolkata), "2024-06-01T23:00");

        // Standard time in winter
        let instant = utc("2024-01-15T17:30:00Z");
        assert_eq!(to_input_value(instant, DisplayZone::Chicago), "2024-01-15T11:30");
        assert_eq!(to_input_value(instant, DisplayZone::Kolkata), "2024-01-15T23:00");
    }

    #[test]
    fn test_from_input_value() {
        assert_eq!(
            from_input_value("2024-06-01T12:30", DisplayZone::Chicago),
            Some(utc("2024-06-01T17:30:00Z"))
        );
        assert_eq!(
            from_input_value("2024-06-01T23:00", DisplayZone::Kolkata),
            Some(utc("2024-06-01T17:30:00Z"))
        );
    }

    #[test]
    fn test_from_input_value_rejects_malformed() {
        for value in [
            "",
            "2024-06-01",
            "2024-06-01T12:30:00",
            "2024-6-01T12:30",
            "2024-06-01 12:30",
            "2024-13-01T12:30",
            "2024-02-30T12:30",
            "2024-06-01T25:00",
            "+024-06-01T12:30",
            "not a date value",
        ] {
            assert_eq!(from_input_value(value, DisplayZone::Chicago), None, "{}", value);
        }
    }

    #[test]
    fn test_from_input_value_dst_transitions() {
        // 02:30 doesn't exist on the spring-forward day
        assert_eq!(
            from_input_value("2024-03-10T02:30", DisplayZone::Chicago),
            Some(utc("2024-03-10T08:30:00Z"))
        );
        // 01:30 happens twice on the fall-back day, take the first (CDT)
        assert_eq!(
            from_input_value("2024-11-03T01:30", DisplayZone::Chicago),
            Some(utc("2024-11-03T06:30:00Z"))
        );
    }

    #[test]
    fn test_round_trip_minute_precision() {
        let start = utc("2024-01-01T00:00:00Z");
        for zone in DisplayZone::ALL {
            // Every 37 minutes for a year covers both DST transitions
            for step in 0..(365 * 24 * 60 / 37) {
                let instant = start + Duration::minutes(step * 37);
                let local = to_input_value(instant, zone);
                let naive = NaiveDateTime::parse_from_str(&local, INPUT_FORMAT).unwrap();
                if let LocalResult::Ambiguous(_, _) = zone.tz().from_local_datetime(&naive) {
                    continue;
                }
                assert_eq!(from_input_value(&local, zone), Some(instant), "{} {}", zone, local);
            }
        }
    }

    #[test]
    fn test_to_utc_iso() {
        assert_eq!(
            to_utc_iso("2024-06-01T12:30", DisplayZone::Chicago).as_deref(),
            Some("2024-06-01T17:30:00.000Z")
        );
        assert_eq!(to_utc_iso("", DisplayZone::Chicago), None);
    }

    #[test]
    fn test_duration_preview() {
        assert_eq!(
            duration_preview("2024-06-01T12:30", "2024-06-01T14:00", DisplayZone::Chicago),
            "1.5h"
        );
        assert_eq!(
            duration_preview("2024-06-01T12:30", "2024-06-01T12:50", DisplayZone::Kolkata),
            "0.3h"
        );
        assert_eq!(duration_preview("2024-06-01T12:30", "", DisplayZone::Chicago), "--");
        assert_eq!(duration_preview("garbage", "2024-06-01T12:30", DisplayZone::Chicago), "--");
    }

    #[test]
    fn test_duration_preview_across_dst() {
        // Midnight to 4am on the spring-forward day is only three hours
        assert_eq!(
            duration_preview("2024-03-10T00:00", "2024-03-10T04:00", DisplayZone::Chicago),
            "3.0h"
        );
    }

    #[test]
    fn test_utc_preview() {
        assert_eq!(utc_preview("2024-06-01T12:30", DisplayZone::Chicago), "Jun 01, 5:30 PM");
        assert_eq!(utc_preview("", DisplayZone::Chicago), "--");
    }

    #[test]
    fn test_zone_parsing() {
        assert_eq!("Asia/Kolkata".parse::<DisplayZone>(), Ok(DisplayZone::Kolkata));
        assert_eq!("America/Chicago".parse::<DisplayZone>(), Ok(DisplayZone::Chicago));
        assert!("Europe/London".parse::<DisplayZone>().is_err());
        assert_eq!(DisplayZone::default(), DisplayZone::Chicago);
    }
}
