//! Time types for booking data.
//!
//! The booking API reports every date as a naive wall-clock string such as
//! `2025-06-01T10:00:00`, without any offset. [`WallClock`] parses that
//! format and [`WallClock::localize`] pins it to the configured IANA zone.
//! [`TimeWindow`] is the UTC range used when querying calendar stores.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Format used by the booking API for every timestamp.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A timestamp string did not match [`WALL_CLOCK_FORMAT`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp {value:?}: expected YYYY-MM-DDTHH:MM:SS")]
pub struct ParseWallClockError {
    value: String,
}

/// A time zone name is not a known IANA identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time zone {0:?}")]
pub struct UnknownTimeZone(pub String);

/// Parses an IANA time zone name such as `Europe/London`.
pub fn parse_time_zone(name: &str) -> Result<Tz, UnknownTimeZone> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| UnknownTimeZone(name.to_string()))
}

/// A naive local wall-clock timestamp as reported by the booking API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallClock(NaiveDateTime);

impl WallClock {
    /// Wraps an already parsed naive datetime.
    pub fn new(naive: NaiveDateTime) -> Self {
        Self(naive)
    }

    /// Parses a `YYYY-MM-DDTHH:MM:SS` string.
    pub fn parse(value: &str) -> Result<Self, ParseWallClockError> {
        NaiveDateTime::parse_from_str(value.trim(), WALL_CLOCK_FORMAT)
            .map(Self)
            .map_err(|_| ParseWallClockError {
                value: value.to_string(),
            })
    }

    /// Returns the underlying naive datetime.
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Interprets this wall-clock time in the given zone.
    ///
    /// An ambiguous time (clocks going back) resolves to the earlier instant.
    /// A time inside a DST gap (clocks going forward) does not exist, so it
    /// is shifted forward by one hour, matching what a wall clock would show.
    pub fn localize(&self, tz: &Tz) -> DateTime<Tz> {
        match tz.from_local_datetime(&self.0) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => tz
                .from_local_datetime(&(self.0 + Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&self.0)),
        }
    }
}

impl FromStr for WallClock {
    type Err = ParseWallClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WALL_CLOCK_FORMAT))
    }
}

impl Serialize for WallClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

/// A closed time range `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window. Inverted bounds are swapped.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Creates the window spanned by an event in any zone.
    pub fn spanning<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
    }

    /// Returns true if the given instant falls inside the window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }

    /// Returns true if the range `[start, end]` shares at least one instant
    /// with this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end && end >= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Europe::London;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn wall(value: &str) -> WallClock {
        WallClock::parse(value).unwrap()
    }

    mod wall_clock {
        use super::*;

        #[test]
        fn parses_api_format() {
            let parsed = wall("2025-06-01T10:00:00");
            let expected = NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap();
            assert_eq!(parsed.naive(), expected);
            assert_eq!(parsed.to_string(), "2025-06-01T10:00:00");
        }

        #[test]
        fn rejects_other_formats() {
            assert!(WallClock::parse("2025-06-01").is_err());
            assert!(WallClock::parse("01/06/2025 10:00").is_err());
            assert!(WallClock::parse("2025-06-01T10:00:00+01:00").is_err());
            assert!(WallClock::parse("").is_err());
        }

        #[test]
        fn localizes_summer_time() {
            let local = wall("2025-06-01T10:00:00").localize(&London);
            assert_eq!(local.to_rfc3339(), "2025-06-01T10:00:00+01:00");
            assert_eq!(local.with_timezone(&Utc), utc(2025, 6, 1, 9, 0, 0));
        }

        #[test]
        fn localizes_winter_time() {
            let local = wall("2025-01-15T08:30:00").localize(&London);
            assert_eq!(local.to_rfc3339(), "2025-01-15T08:30:00+00:00");
        }

        #[test]
        fn ambiguous_time_resolves_to_earliest() {
            // Clocks go back at 02:00 BST on 2025-10-26, so 01:30 happens twice.
            let local = wall("2025-10-26T01:30:00").localize(&London);
            assert_eq!(local.with_timezone(&Utc), utc(2025, 10, 26, 0, 30, 0));
        }

        #[test]
        fn gap_time_shifts_forward() {
            // Clocks go forward at 01:00 GMT on 2025-03-30, so 01:30 never exists.
            let local = wall("2025-03-30T01:30:00").localize(&London);
            assert_eq!(local.to_rfc3339(), "2025-03-30T02:30:00+01:00");
        }

        #[test]
        fn serde_uses_api_format() {
            let json = serde_json::to_string(&wall("2025-06-01T10:00:00")).unwrap();
            assert_eq!(json, "\"2025-06-01T10:00:00\"");

            let parsed: WallClock = serde_json::from_str("\"2025-07-14T23:59:59\"").unwrap();
            assert_eq!(parsed, wall("2025-07-14T23:59:59"));

            let bad: Result<WallClock, _> = serde_json::from_str("\"tomorrow\"");
            assert!(bad.is_err());
        }
    }

    mod time_zone {
        use super::*;

        #[test]
        fn parses_known_zone() {
            assert_eq!(parse_time_zone("Europe/London").unwrap(), London);
            assert_eq!(parse_time_zone(" UTC ").unwrap(), chrono_tz::UTC);
        }

        #[test]
        fn rejects_unknown_zone() {
            let err = parse_time_zone("Mars/Olympus_Mons").unwrap_err();
            assert!(err.to_string().contains("Mars/Olympus_Mons"));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn spanning_orders_bounds() {
            let a = utc(2025, 6, 1, 10, 0, 0);
            let b = utc(2025, 6, 1, 9, 0, 0);
            let window = TimeWindow::spanning(&a, &b);
            assert_eq!(window.start, b);
            assert_eq!(window.end, a);
        }

        #[test]
        fn contains_is_inclusive() {
            let window = TimeWindow::new(utc(2025, 6, 1, 9, 0, 0), utc(2025, 6, 1, 10, 0, 0));
            assert!(window.contains(utc(2025, 6, 1, 9, 0, 0)));
            assert!(window.contains(utc(2025, 6, 1, 10, 0, 0)));
            assert!(!window.contains(utc(2025, 6, 1, 10, 0, 1)));
        }

        #[test]
        fn overlaps() {
            let window = TimeWindow::new(utc(2025, 6, 1, 9, 0, 0), utc(2025, 6, 1, 10, 0, 0));
            assert!(window.overlaps(utc(2025, 6, 1, 8, 0, 0), utc(2025, 6, 1, 9, 0, 0)));
            assert!(window.overlaps(utc(2025, 6, 1, 9, 30, 0), utc(2025, 6, 1, 9, 45, 0)));
            assert!(!window.overlaps(utc(2025, 6, 1, 10, 0, 1), utc(2025, 6, 1, 11, 0, 0)));
        }

        #[test]
        fn inverted_bounds_are_swapped() {
            let window = TimeWindow::new(utc(2025, 6, 1, 10, 0, 0), utc(2025, 6, 1, 9, 0, 0));
            assert_eq!(window.start, utc(2025, 6, 1, 9, 0, 0));
            assert_eq!(window.end, utc(2025, 6, 1, 10, 0, 0));
            assert!(window.contains(utc(2025, 6, 1, 9, 30, 0)));
        }
    }
}
