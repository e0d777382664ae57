//! Plain-text rendering of event listings.

use std::io::{self, Write};

use crate::event::Event;

/// Printed by the upcoming listing when nothing is scheduled.
pub const NO_UPCOMING_TEXT: &str = "No upcoming events found.";

/// Header printed before a non-empty upcoming listing.
pub const UPCOMING_HEADER: &str = "Upcoming events:";

/// Printed by the range listing when the range holds no events.
pub const NO_EVENTS_IN_RANGE_TEXT: &str = "No events in range.";

/// Formats one event as `summary (start to end)`.
///
/// The summary is printed as the service returned it, even when empty.
/// All-day bounds render as `YYYY-MM-DD`, timed bounds as RFC 3339 with the
/// offset the service reported.
pub fn event_line(event: &Event) -> String {
    format!("{} ({} to {})", event.summary, event.start, event.end)
}

/// Writes the upcoming-events listing.
pub fn write_upcoming<W: Write>(out: &mut W, events: &[Event]) -> io::Result<()> {
    if events.is_empty() {
        return writeln!(out, "{NO_UPCOMING_TEXT}");
    }
    writeln!(out, "{UPCOMING_HEADER}")?;
    write_lines(out, events)
}

/// Writes the events of a range, one per line.
pub fn write_events<W: Write>(out: &mut W, events: &[Event]) -> io::Result<()> {
    if events.is_empty() {
        return writeln!(out, "{NO_EVENTS_IN_RANGE_TEXT}");
    }
    write_lines(out, events)
}

fn write_lines<W: Write>(out: &mut W, events: &[Event]) -> io::Result<()> {
    for event in events {
        writeln!(out, "{}", event_line(event))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::EventTime;
    use chrono::{DateTime, NaiveDate};

    fn timed(summary: &str, start: &str, end: &str) -> Event {
        Event::new(
            summary,
            EventTime::DateTime(DateTime::parse_from_rfc3339(start).unwrap()),
            EventTime::DateTime(DateTime::parse_from_rfc3339(end).unwrap()),
        )
    }

    fn all_day(summary: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Event {
        Event::new(
            summary,
            EventTime::from_date(NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap()),
            EventTime::from_date(NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap()),
        )
    }

    fn render(f: fn(&mut Vec<u8>, &[Event]) -> io::Result<()>, events: &[Event]) -> String {
        let mut buf = Vec::new();
        f(&mut buf, events).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn upcoming_empty_is_single_line() {
        let output = render(write_upcoming, &[]);
        assert_eq!(output, "No upcoming events found.\n");
    }

    #[test]
    fn upcoming_lists_events_in_given_order() {
        let events = vec![
            timed(
                "Team Standup",
                "2015-05-22T09:00:00+02:00",
                "2015-05-22T09:15:00+02:00",
            ),
            all_day("Conference", (2015, 5, 23), (2015, 5, 24)),
            timed("Retro", "2015-05-24T10:00:00Z", "2015-05-24T11:00:00Z"),
        ];

        insta::assert_snapshot!(render(write_upcoming, &events), @r"
        Upcoming events:
        Team Standup (2015-05-22T09:00:00+02:00 to 2015-05-22T09:15:00+02:00)
        Conference (2015-05-23 to 2015-05-24)
        Retro (2015-05-24T10:00:00+00:00 to 2015-05-24T11:00:00+00:00)
        ");
    }

    #[test]
    fn summary_printed_verbatim() {
        let blank = timed("", "2015-05-24T10:00:00Z", "2015-05-24T11:00:00Z");
        assert_eq!(
            event_line(&blank),
            " (2015-05-24T10:00:00+00:00 to 2015-05-24T11:00:00+00:00)"
        );

        let padded = timed(" Retro ", "2015-05-24T10:00:00Z", "2015-05-24T11:00:00Z");
        assert_eq!(
            event_line(&padded),
            " Retro  (2015-05-24T10:00:00+00:00 to 2015-05-24T11:00:00+00:00)"
        );
    }

    #[test]
    fn range_listing_empty() {
        assert_eq!(render(write_events, &[]), "No events in range.\n");
    }

    #[test]
    fn range_listing_has_no_header() {
        let events = vec![all_day("Holiday", (2015, 5, 25), (2015, 5, 26))];
        insta::assert_snapshot!(render(write_events, &events), @"Holiday (2015-05-25 to 2015-05-26)");
    }

    #[test]
    fn event_line_all_day() {
        let event = all_day("Offsite", (2015, 1, 31), (2015, 2, 1));
        assert_eq!(event_line(&event), "Offsite (2015-01-31 to 2015-02-01)");
    }
}
