//! Calendar operations over one configured calendar.

use std::io::Write;

use calbook_core::{DateRange, Event, NewEvent, format};
use calbook_providers::{CalendarProvider, EventQuery};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Whether booking checks the range first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingPolicy {
    /// Refuse to book over existing events.
    #[default]
    RequireFree,
    /// Insert regardless of what is already there.
    Unchecked,
}

/// Outcome of [`Agenda::release`].
#[derive(Debug, Default)]
pub struct Release {
    /// Events removed from the calendar.
    pub deleted: Vec<Event>,
    /// Events left in place: partial overlaps and events without an id.
    pub kept: Vec<Event>,
}

/// The calendar all commands operate on.
///
/// Every operation is one or more sequential provider requests; provider
/// errors are returned unchanged.
pub struct Agenda<'a> {
    provider: &'a dyn CalendarProvider,
    calendar_id: String,
    timezone: Tz,
}

impl<'a> Agenda<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, calendar_id: impl Into<String>, timezone: Tz) -> Self {
        Self {
            provider,
            calendar_id: calendar_id.into(),
            timezone,
        }
    }

    /// Returns true if no event intersects `range`.
    pub async fn is_free(&self, range: &DateRange) -> ClientResult<bool> {
        Ok(self.conflicts(range).await?.is_empty())
    }

    /// Returns the events that make `range` busy. Empty when it is free.
    pub async fn conflicts(&self, range: &DateRange) -> ClientResult<Vec<Event>> {
        self.events_in(range).await
    }

    /// Lists the events intersecting `range`, in the order the service returns them.
    ///
    /// All-day events cover their dates in the agenda's timezone.
    pub async fn events_in(&self, range: &DateRange) -> ClientResult<Vec<Event>> {
        let query = EventQuery::in_range(range).with_timezone(self.timezone);
        let events = self.provider.list_events(&self.calendar_id, query).await?;
        debug!(
            calendar = %self.calendar_id,
            range = %range,
            count = events.len(),
            "listed events"
        );
        Ok(events)
    }

    /// Creates one event spanning `range`.
    ///
    /// Not idempotent: booking the same range twice creates two events.
    pub async fn book(
        &self,
        summary: &str,
        range: &DateRange,
        policy: BookingPolicy,
    ) -> ClientResult<Event> {
        if policy == BookingPolicy::RequireFree {
            let conflicts = self.conflicts(range).await?;
            if !conflicts.is_empty() {
                return Err(ClientError::RangeBusy {
                    range: *range,
                    conflicts,
                });
            }
        }

        let new_event = NewEvent::new(summary, *range, self.timezone);
        let event = self
            .provider
            .insert_event(&self.calendar_id, &new_event)
            .await?;
        info!(calendar = %self.calendar_id, summary, "booked {}", range);
        Ok(event)
    }

    /// Deletes the events lying entirely inside `range`.
    ///
    /// Events that only partially overlap, or that carry no id, are kept.
    /// An all-day event lies inside a range covering its local days.
    pub async fn release(&self, range: &DateRange) -> ClientResult<Release> {
        let mut release = Release::default();

        for event in self.events_in(range).await? {
            let id = match event.id.as_deref() {
                Some(id) if event.is_within(range, &self.timezone) => id.to_string(),
                _ => {
                    debug!(summary = %event.summary, "keeping event");
                    release.kept.push(event);
                    continue;
                }
            };

            self.provider.delete_event(&self.calendar_id, &id).await?;
            info!(calendar = %self.calendar_id, id = %id, "released {}", event.summary);
            release.deleted.push(event);
        }

        Ok(release)
    }

    /// Lists up to `count` events starting from `now`, ordered by start time.
    pub async fn upcoming(&self, count: usize, now: DateTime<Utc>) -> ClientResult<Vec<Event>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let query = EventQuery::upcoming(now, count).with_timezone(self.timezone);
        let events = self.provider.list_events(&self.calendar_id, query).await?;
        Ok(events)
    }

    /// Writes the next `count` events, or a notice when there are none.
    pub async fn write_upcoming<W: Write>(
        &self,
        count: usize,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> ClientResult<()> {
        let events = self.upcoming(count, now).await?;
        format::write_upcoming(out, &events)?;
        Ok(())
    }

    /// Writes the events intersecting `range`.
    pub async fn write_events<W: Write>(&self, range: &DateRange, out: &mut W) -> ClientResult<()> {
        let events = self.events_in(range).await?;
        format::write_events(out, &events)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calbook_core::EventTime;
    use calbook_providers::{MemoryProvider, ProviderError, ProviderErrorCode};
    use chrono::{NaiveDate, TimeZone};

    const CAL: &str = "team@group.calendar.google.com";

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 5, day, hour, 0, 0).unwrap()
    }

    fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    fn event(id: &str, summary: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event::new(
            summary,
            EventTime::from_instant(start),
            EventTime::from_instant(end),
        )
        .with_id(id)
    }

    fn agenda(provider: &MemoryProvider) -> Agenda<'_> {
        Agenda::new(provider, CAL, chrono_tz::Europe::Berlin)
    }

    /// All-day event on 2015-05-28.
    fn offsite() -> Event {
        let day = NaiveDate::from_ymd_opt(2015, 5, 28).unwrap();
        Event::new(
            "Offsite",
            EventTime::from_date(day),
            EventTime::from_date(day.succ_opt().unwrap()),
        )
        .with_id("allday")
    }

    mod free {
        use super::*;

        #[tokio::test]
        async fn empty_calendar_is_free() {
            let provider = MemoryProvider::new();
            assert!(agenda(&provider).is_free(&range(at(28, 9), at(28, 17))).await.unwrap());
        }

        #[tokio::test]
        async fn one_overlap_makes_range_busy() {
            let provider =
                MemoryProvider::new().with_event(CAL, event("a", "Lunch", at(28, 12), at(28, 13)));
            let agenda = agenda(&provider);

            assert!(!agenda.is_free(&range(at(28, 9), at(28, 17))).await.unwrap());
            assert!(!agenda.is_free(&range(at(28, 13), at(28, 14))).await.unwrap());
            assert!(agenda.is_free(&range(at(28, 14), at(28, 17))).await.unwrap());
        }

        #[tokio::test]
        async fn all_day_event_busies_only_its_local_day() {
            let provider = MemoryProvider::new().with_event(CAL, offsite());
            let agenda = agenda(&provider);
            let tz = chrono_tz::Europe::Berlin;

            let next_morning = DateRange::parse("2015-05-29 00:30", "2015-05-29 01:30", &tz).unwrap();
            assert!(agenda.is_free(&next_morning).await.unwrap());

            let same_night = DateRange::parse("2015-05-28 23:00", "2015-05-28 23:30", &tz).unwrap();
            let conflicts = agenda.conflicts(&same_night).await.unwrap();
            assert_eq!(conflicts.len(), 1);
            assert_eq!(provider.queries()[1].timezone, Some(tz));
        }

        #[tokio::test]
        async fn other_calendars_are_ignored() {
            let provider = MemoryProvider::new().with_event(
                "primary",
                event("a", "Lunch", at(28, 12), at(28, 13)),
            );
            assert!(agenda(&provider).is_free(&range(at(28, 9), at(28, 17))).await.unwrap());
        }

        #[tokio::test]
        async fn provider_errors_propagate() {
            let provider = MemoryProvider::new();
            provider.fail_with(ProviderError::rate_limited("slow down"));

            let err = agenda(&provider)
                .is_free(&range(at(28, 9), at(28, 17)))
                .await
                .unwrap_err();
            match err {
                ClientError::Provider(e) => assert_eq!(e.code(), ProviderErrorCode::RateLimited),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod listing {
        use super::*;

        #[tokio::test]
        async fn keeps_service_order() {
            let provider = MemoryProvider::new()
                .with_event(CAL, event("late", "Review", at(28, 15), at(28, 16)))
                .with_event(CAL, event("early", "Standup", at(28, 9), at(28, 10)))
                .with_event(CAL, event("out", "Next day", at(29, 9), at(29, 10)));

            let events = agenda(&provider)
                .events_in(&range(at(28, 0), at(28, 23)))
                .await
                .unwrap();
            let ids: Vec<_> = events.iter().filter_map(|e| e.id.as_deref()).collect();
            assert_eq!(ids, ["late", "early"]);

            let queries = provider.queries();
            assert_eq!(queries.len(), 1);
            assert_eq!(queries[0].time_min, Some(at(28, 0)));
            assert_eq!(queries[0].time_max, Some(at(28, 23)));
        }

        #[tokio::test]
        async fn empty_result_is_not_an_error() {
            let provider = MemoryProvider::new();
            let events = agenda(&provider)
                .events_in(&range(at(28, 0), at(28, 23)))
                .await
                .unwrap();
            assert!(events.is_empty());
        }

        #[tokio::test]
        async fn write_events_lines() {
            let provider = MemoryProvider::new()
                .with_event(CAL, event("a", "Standup", at(28, 9), at(28, 10)));
            let agenda = agenda(&provider);

            let mut buf = Vec::new();
            agenda
                .write_events(&range(at(28, 0), at(28, 23)), &mut buf)
                .await
                .unwrap();
            insta::assert_snapshot!(String::from_utf8(buf).unwrap(), @"Standup (2015-05-28T09:00:00+00:00 to 2015-05-28T10:00:00+00:00)");

            let mut buf = Vec::new();
            agenda
                .write_events(&range(at(29, 0), at(29, 23)), &mut buf)
                .await
                .unwrap();
            insta::assert_snapshot!(String::from_utf8(buf).unwrap(), @"No events in range.");
        }
    }

    mod booking {
        use super::*;

        #[tokio::test]
        async fn unchecked_inserts_even_when_busy() {
            let provider =
                MemoryProvider::new().with_event(CAL, event("a", "Lunch", at(28, 12), at(28, 13)));
            let booked = agenda(&provider)
                .book("X", &range(at(28, 9), at(28, 17)), BookingPolicy::Unchecked)
                .await
                .unwrap();

            let inserts = provider.inserts();
            assert_eq!(inserts.len(), 1);
            let (calendar, payload) = &inserts[0];
            assert_eq!(calendar, CAL);
            assert_eq!(payload.summary, "X");
            assert_eq!(payload.start, at(28, 9));
            assert_eq!(payload.end, at(28, 17));
            assert_eq!(payload.timezone, chrono_tz::Europe::Berlin);

            assert_eq!(booked.summary, "X");
            assert!(booked.id.is_some());
            // No free check was made.
            assert!(provider.queries().is_empty());
        }

        #[tokio::test]
        async fn booking_twice_creates_two_events() {
            let provider = MemoryProvider::new();
            let agenda = agenda(&provider);
            let r = range(at(28, 9), at(28, 17));

            let first = agenda.book("X", &r, BookingPolicy::Unchecked).await.unwrap();
            let second = agenda.book("X", &r, BookingPolicy::Unchecked).await.unwrap();

            assert_eq!(provider.inserts().len(), 2);
            assert_ne!(first.id, second.id);
            assert_eq!(provider.events(CAL).len(), 2);
        }

        #[tokio::test]
        async fn require_free_refuses_busy_range() {
            let provider =
                MemoryProvider::new().with_event(CAL, event("a", "Lunch", at(28, 12), at(28, 13)));
            let err = agenda(&provider)
                .book("X", &range(at(28, 9), at(28, 17)), BookingPolicy::RequireFree)
                .await
                .unwrap_err();

            match err {
                ClientError::RangeBusy { range: r, conflicts } => {
                    assert_eq!(r.start, at(28, 9));
                    assert_eq!(conflicts.len(), 1);
                    assert_eq!(conflicts[0].summary, "Lunch");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(provider.inserts().is_empty());
        }

        #[tokio::test]
        async fn require_free_books_free_range() {
            let provider = MemoryProvider::new();
            agenda(&provider)
                .book("X", &range(at(28, 9), at(28, 17)), BookingPolicy::default())
                .await
                .unwrap();
            assert_eq!(provider.inserts().len(), 1);
            assert_eq!(provider.queries().len(), 1);
        }
    }

    mod release {
        use super::*;

        #[tokio::test]
        async fn deletes_contained_and_keeps_partial() {
            let provider = MemoryProvider::new()
                .with_event(CAL, event("inside", "Booked", at(28, 10), at(28, 12)))
                .with_event(CAL, event("partial", "Overnight", at(27, 22), at(28, 10)))
                .with_event(
                    CAL,
                    Event::new(
                        "Imported",
                        EventTime::from_instant(at(28, 13)),
                        EventTime::from_instant(at(28, 14)),
                    ),
                );

            let release = agenda(&provider)
                .release(&range(at(28, 9), at(28, 17)))
                .await
                .unwrap();

            assert_eq!(release.deleted.len(), 1);
            assert_eq!(release.deleted[0].id.as_deref(), Some("inside"));
            let kept: Vec<_> = release.kept.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(kept, ["Overnight", "Imported"]);

            assert_eq!(
                provider.deletes(),
                vec![(CAL.to_string(), "inside".to_string())]
            );
            assert_eq!(provider.events(CAL).len(), 2);
        }

        #[tokio::test]
        async fn deletes_all_day_event_on_its_local_day() {
            let provider = MemoryProvider::new().with_event(CAL, offsite());
            let tz = chrono_tz::Europe::Berlin;

            let release = agenda(&provider)
                .release(&DateRange::parse("2015-05-28", "2015-05-29", &tz).unwrap())
                .await
                .unwrap();

            assert_eq!(release.deleted.len(), 1);
            assert!(release.kept.is_empty());
            assert_eq!(
                provider.deletes(),
                vec![(CAL.to_string(), "allday".to_string())]
            );
        }

        #[tokio::test]
        async fn empty_range_deletes_nothing() {
            let provider = MemoryProvider::without_delete();
            let release = agenda(&provider)
                .release(&range(at(28, 9), at(28, 17)))
                .await
                .unwrap();
            assert!(release.deleted.is_empty());
            assert!(release.kept.is_empty());
        }

        #[tokio::test]
        async fn provider_without_delete_is_unsupported() {
            let provider = MemoryProvider::without_delete()
                .with_event(CAL, event("inside", "Booked", at(28, 10), at(28, 12)));

            let err = agenda(&provider)
                .release(&range(at(28, 9), at(28, 17)))
                .await
                .unwrap_err();
            match err {
                ClientError::Provider(e) => assert_eq!(e.code(), ProviderErrorCode::Unsupported),
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(provider.events(CAL).len(), 1);
        }
    }

    mod upcoming {
        use super::*;

        #[tokio::test]
        async fn no_events_writes_single_line() {
            let provider = MemoryProvider::new();
            let agenda = agenda(&provider);

            let mut buf = Vec::new();
            agenda.write_upcoming(10, at(22, 12), &mut buf).await.unwrap();
            assert_eq!(String::from_utf8(buf).unwrap(), "No upcoming events found.\n");
        }

        #[tokio::test]
        async fn all_day_event_prints_dates() {
            let provider = MemoryProvider::new().with_event(CAL, offsite());

            let mut buf = Vec::new();
            agenda(&provider)
                .write_upcoming(10, at(22, 12), &mut buf)
                .await
                .unwrap();
            insta::assert_snapshot!(String::from_utf8(buf).unwrap(), @r"
            Upcoming events:
            Offsite (2015-05-28 to 2015-05-29)
            ");
        }

        #[tokio::test]
        async fn ordered_and_limited() {
            let provider = MemoryProvider::new()
                .with_event(CAL, event("c", "Third", at(30, 9), at(30, 10)))
                .with_event(CAL, event("past", "Past", at(20, 9), at(20, 10)))
                .with_event(CAL, event("a", "First", at(28, 9), at(28, 10)))
                .with_event(CAL, event("b", "Second", at(29, 9), at(29, 10)));
            let agenda = agenda(&provider);

            let events = agenda.upcoming(2, at(22, 12)).await.unwrap();
            let titles: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(titles, ["First", "Second"]);

            let query = &provider.queries()[0];
            assert_eq!(query.time_min, Some(at(22, 12)));
            assert_eq!(query.max_results, Some(2));
            assert!(query.single_events);
            assert!(query.order_by_start);
        }

        #[tokio::test]
        async fn zero_count_skips_the_request() {
            let provider =
                MemoryProvider::new().with_event(CAL, event("a", "First", at(28, 9), at(28, 10)));
            let mut buf = Vec::new();
            agenda(&provider)
                .write_upcoming(0, at(22, 12), &mut buf)
                .await
                .unwrap();
            assert_eq!(String::from_utf8(buf).unwrap(), "No upcoming events found.\n");
            assert!(provider.queries().is_empty());
        }
    }
}
