//! Time types for calendar events and booking ranges.
//!
//! This module provides [`EventTime`] for event bounds as returned by the
//! calendar service (a precise instant or an all-day date), [`DateRange`]
//! for the ranges the user queries and books, and parsers that interpret
//! user input in an explicit timezone.

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local date-time layouts accepted on the command line, tried in order.
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Errors produced while parsing or validating times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The input matched none of the accepted layouts.
    #[error("cannot parse '{0}' as a date or date-time")]
    Unparseable(String),

    /// The local time falls into a DST gap in the given timezone.
    #[error("'{input}' does not exist in timezone {timezone}")]
    NonexistentLocalTime { input: String, timezone: String },

    /// The range ends before it starts.
    #[error("range end {end} is before its start {start}")]
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The timezone name is not a known IANA identifier.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// The start or end of a calendar event.
///
/// The calendar service reports either a precise instant (we keep the UTC
/// offset it was reported with, so listings show the event's own local
/// time) or a bare date for all-day events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant with the offset the service reported.
    DateTime(DateTime<FixedOffset>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_instant<Z: TimeZone>(dt: DateTime<Z>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime, reading all-day dates as midnight UTC.
    ///
    /// Used for ordering; range checks go through [`EventTime::to_utc_in`].
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.to_utc_in(&Tz::UTC)
    }

    /// Converts to a UTC datetime, reading all-day dates as the start of
    /// that day in `tz`.
    ///
    /// When local midnight falls into a DST gap, the day starts at the
    /// offset in effect at UTC midnight.
    pub fn to_utc_in(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::AllDay(date) => {
                let midnight = date.and_time(NaiveTime::MIN);
                match tz.from_local_datetime(&midnight).earliest() {
                    Some(dt) => dt.with_timezone(&Utc),
                    None => {
                        let offset = tz.offset_from_utc_datetime(&midnight).fix();
                        midnight.and_utc() - Duration::seconds(offset.local_minus_utc().into())
                    }
                }
            }
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::AllDay(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc().cmp(&other.to_utc())
    }
}

/// An inclusive range of instants used for free/busy queries and bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start of the range.
    pub start: DateTime<Utc>,
    /// End of the range.
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, rejecting one whose end precedes its start.
    ///
    /// A zero-length range (`start == end`) is allowed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeError> {
        if end < start {
            return Err(TimeError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses both bounds with [`parse_instant`] and builds the range.
    pub fn parse(start: &str, end: &str, tz: &Tz) -> Result<Self, TimeError> {
        Self::new(parse_instant(start, tz)?, parse_instant(end, tz)?)
    }

    /// Returns true if an event with these bounds lies entirely inside the
    /// range. All-day bounds are read in `tz`.
    pub fn contains_event(&self, start: &EventTime, end: &EventTime, tz: &Tz) -> bool {
        self.start <= start.to_utc_in(tz) && end.to_utc_in(tz) <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parses a user-supplied instant.
///
/// Accepted inputs:
/// - RFC 3339 with an offset (`2015-05-22T10:00:00+02:00`), taken as is
/// - a local date-time (`2015-05-22T10:00`, `2015-05-22 10:00:30`)
/// - a bare date (`2015-05-22`), meaning local midnight
///
/// Local forms are interpreted in `tz`. Times inside a DST gap are
/// rejected, and ambiguous times resolve to the earlier instant.
pub fn parse_instant(input: &str, tz: &Tz) -> Result<DateTime<Utc>, TimeError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for layout in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
            return resolve_local(naive, tz, input);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return resolve_local(date.and_time(NaiveTime::MIN), tz, input);
    }

    Err(TimeError::Unparseable(input.to_string()))
}

/// Looks up an IANA timezone by name (e.g. `Europe/Berlin`).
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

fn resolve_local(naive: NaiveDateTime, tz: &Tz, input: &str) -> Result<DateTime<Utc>, TimeError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(TimeError::NonexistentLocalTime {
            input: input.to_string(),
            timezone: tz.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn keeps_reported_offset() {
            let dt = DateTime::parse_from_rfc3339("2015-05-22T00:00:00+02:00").unwrap();
            let et = EventTime::DateTime(dt);
            assert_eq!(et.to_string(), "2015-05-22T00:00:00+02:00");
            assert_eq!(et.to_utc(), utc(2015, 5, 21, 22, 0));
        }

        #[test]
        fn all_day_displays_date_only() {
            let et = EventTime::from_date(date(2015, 5, 22));
            assert!(et.is_all_day());
            assert_eq!(et.to_string(), "2015-05-22");
            assert_eq!(et.to_utc(), utc(2015, 5, 22, 0, 0));
        }

        #[test]
        fn all_day_starts_at_local_midnight() {
            let et = EventTime::from_date(date(2015, 5, 22));
            assert_eq!(et.to_utc_in(&Berlin), utc(2015, 5, 21, 22, 0));
            assert_eq!(et.to_utc_in(&chrono_tz::UTC), et.to_utc());

            let winter = EventTime::from_date(date(2015, 1, 31));
            assert_eq!(winter.to_utc_in(&Berlin), utc(2015, 1, 30, 23, 0));

            let timed = EventTime::from_instant(utc(2015, 5, 22, 9, 0));
            assert_eq!(timed.to_utc_in(&Berlin), utc(2015, 5, 22, 9, 0));
        }

        #[test]
        fn all_day_in_midnight_gap() {
            // Sao Paulo skipped from 00:00 to 01:00 on 2015-10-18.
            let et = EventTime::from_date(date(2015, 10, 18));
            assert_eq!(
                et.to_utc_in(&chrono_tz::America::Sao_Paulo),
                utc(2015, 10, 18, 3, 0)
            );
        }

        #[test]
        fn from_instant_converts_zone() {
            let local = Berlin.with_ymd_and_hms(2015, 1, 31, 0, 0, 0).unwrap();
            let et = EventTime::from_instant(local);
            assert_eq!(et.to_string(), "2015-01-31T00:00:00+01:00");
        }

        #[test]
        fn ordering_mixes_kinds() {
            let morning = EventTime::from_instant(utc(2015, 5, 22, 9, 0));
            let all_day = EventTime::from_date(date(2015, 5, 22));
            assert!(all_day < morning);
        }

        #[test]
        fn serde_roundtrip() {
            let et = EventTime::from_date(date(2015, 5, 22));
            let json = serde_json::to_string(&et).unwrap();
            let parsed: EventTime = serde_json::from_str(&json).unwrap();
            assert_eq!(et, parsed);
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn rfc3339_ignores_timezone() {
            let parsed = parse_instant("2015-05-22T10:00:00+02:00", &chrono_tz::UTC).unwrap();
            assert_eq!(parsed, utc(2015, 5, 22, 8, 0));
        }

        #[test]
        fn bare_date_is_local_midnight() {
            let parsed = parse_instant("2015-05-22", &Berlin).unwrap();
            assert_eq!(parsed, utc(2015, 5, 21, 22, 0));
        }

        #[test]
        fn local_datetime_layouts() {
            let expected = utc(2015, 1, 31, 9, 30);
            for input in [
                "2015-01-31T10:30",
                "2015-01-31T10:30:00",
                "2015-01-31 10:30",
                " 2015-01-31 10:30:00 ",
            ] {
                assert_eq!(parse_instant(input, &Berlin).unwrap(), expected, "{input}");
            }
        }

        #[test]
        fn dst_gap_is_rejected() {
            let err = parse_instant("2015-03-29T02:30", &Berlin).unwrap_err();
            assert!(matches!(err, TimeError::NonexistentLocalTime { .. }));
            assert!(err.to_string().contains("Europe/Berlin"));
        }

        #[test]
        fn dst_overlap_takes_earlier_instant() {
            let parsed = parse_instant("2015-10-25T02:30", &Berlin).unwrap();
            assert_eq!(parsed, utc(2015, 10, 25, 0, 30));
        }

        #[test]
        fn garbage_is_rejected() {
            let err = parse_instant("03/22/2010", &Berlin).unwrap_err();
            assert_eq!(err, TimeError::Unparseable("03/22/2010".to_string()));
        }

        #[test]
        fn timezone_lookup() {
            assert_eq!(parse_timezone("Europe/Berlin").unwrap(), Berlin);
            assert!(matches!(
                parse_timezone("Mars/Olympus"),
                Err(TimeError::UnknownTimezone(_))
            ));
        }
    }

    mod date_range {
        use super::*;

        #[test]
        fn rejects_inverted_bounds() {
            let err = DateRange::new(utc(2015, 5, 23, 0, 0), utc(2015, 5, 22, 0, 0)).unwrap_err();
            assert!(matches!(err, TimeError::InvertedRange { .. }));
        }

        #[test]
        fn allows_zero_length() {
            let at = utc(2015, 5, 22, 0, 0);
            assert!(DateRange::new(at, at).is_ok());
        }

        #[test]
        fn parse_in_timezone() {
            let range = DateRange::parse("2015-05-22", "2015-05-23", &Berlin).unwrap();
            assert_eq!(range.start, utc(2015, 5, 21, 22, 0));
            assert_eq!(range.end, utc(2015, 5, 22, 22, 0));
        }

        #[test]
        fn containment() {
            let range = DateRange::new(utc(2015, 5, 22, 8, 0), utc(2015, 5, 22, 18, 0)).unwrap();
            let inside = (
                EventTime::from_instant(utc(2015, 5, 22, 9, 0)),
                EventTime::from_instant(utc(2015, 5, 22, 10, 0)),
            );
            let straddling = (
                EventTime::from_instant(utc(2015, 5, 22, 17, 0)),
                EventTime::from_instant(utc(2015, 5, 22, 19, 0)),
            );
            let outside = (
                EventTime::from_instant(utc(2015, 5, 23, 9, 0)),
                EventTime::from_instant(utc(2015, 5, 23, 10, 0)),
            );

            let tz = chrono_tz::UTC;
            assert!(range.contains_event(&inside.0, &inside.1, &tz));
            assert!(!range.contains_event(&straddling.0, &straddling.1, &tz));
            assert!(!range.contains_event(&outside.0, &outside.1, &tz));
        }

        #[test]
        fn all_day_containment_uses_local_day() {
            let range = DateRange::parse("2015-05-28", "2015-05-29", &Berlin).unwrap();
            let start = EventTime::from_date(date(2015, 5, 28));
            let end = EventTime::from_date(date(2015, 5, 29));
            assert!(range.contains_event(&start, &end, &Berlin));
            assert!(!range.contains_event(&start, &end, &chrono_tz::UTC));
        }
    }
}
