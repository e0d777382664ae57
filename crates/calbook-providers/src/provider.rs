//! CalendarProvider trait definition.
//!
//! [`CalendarProvider`] is the seam between the calendar glue and a concrete
//! backend. Every operation names the calendar it targets; providers hold
//! no notion of a "current" calendar.

use std::future::Future;
use std::pin::Pin;

use calbook_core::{DateRange, Event, NewEvent};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{ProviderError, ProviderResult};

/// Options for listing events.
///
/// Mirrors the Calendar API listing parameters: `timeMin`, `timeMax`,
/// `maxResults`, `singleEvents` and `orderBy=startTime`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Only return events ending after this instant.
    pub time_min: Option<DateTime<Utc>>,
    /// Only return events starting before this instant.
    pub time_max: Option<DateTime<Utc>>,
    /// Maximum number of events to return.
    pub max_results: Option<usize>,
    /// Expand recurring events into their instances.
    pub single_events: bool,
    /// Order by start time. Only honored together with `single_events`.
    pub order_by_start: bool,
    /// Zone all-day dates are read in when filtering. UTC when unset.
    pub timezone: Option<Tz>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the events intersecting `range`.
    pub fn in_range(range: &DateRange) -> Self {
        Self::new()
            .with_time_min(range.start)
            .with_time_max(range.end)
    }

    /// Query for the next `count` event instances starting from `now`, in start order.
    pub fn upcoming(now: DateTime<Utc>, count: usize) -> Self {
        Self::new()
            .with_time_min(now)
            .with_max_results(count)
            .with_single_events(true)
            .with_order_by_start(true)
    }

    pub fn with_time_min(mut self, time_min: DateTime<Utc>) -> Self {
        self.time_min = Some(time_min);
        self
    }

    pub fn with_time_max(mut self, time_max: DateTime<Utc>) -> Self {
        self.time_max = Some(time_max);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn with_single_events(mut self, single_events: bool) -> Self {
        self.single_events = single_events;
        self
    }

    pub fn with_order_by_start(mut self, order_by_start: bool) -> Self {
        self.order_by_start = order_by_start;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Returns true if an event with these bounds passes the time filters.
    ///
    /// Both bounds are inclusive: an event matches when it ends at or after
    /// `time_min` and starts at or before `time_max`. All-day dates start at
    /// local midnight in `timezone`.
    pub fn matches(&self, event: &Event) -> bool {
        let tz = self.timezone.unwrap_or(Tz::UTC);
        let after_min = self
            .time_min
            .is_none_or(|min| event.end.to_utc_in(&tz) >= min);
        let before_max = self
            .time_max
            .is_none_or(|max| event.start.to_utc_in(&tz) <= max);
        after_min && before_max
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the glue can hold a
/// `Box<dyn CalendarProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar backends.
///
/// # Example Implementation
///
/// ```ignore
/// impl CalendarProvider for GoogleProvider {
///     fn name(&self) -> &str { "google" }
///
///     fn list_events<'a>(
///         &'a self,
///         calendar_id: &'a str,
///         query: EventQuery,
///     ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
///         Box::pin(async move {
///             // GET /calendars/{calendar_id}/events
///             Ok(events)
///         })
///     }
///     // ...
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g. "google", "memory").
    fn name(&self) -> &str;

    /// Lists events on `calendar_id` matching `query`, in service order.
    ///
    /// Pagination is handled internally.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        query: EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>>;

    /// Inserts a new event and returns it as stored by the service.
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<Event>>;

    /// Deletes an event by id.
    ///
    /// The default implementation reports an unsupported operation.
    fn delete_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        _event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let error = ProviderError::unsupported("deleting events is not supported by this provider")
            .with_provider(self.name());
        Box::pin(async move { Err(error) })
    }
}
