//! Event types for calendar events.
//!
//! - [`Event`]: an event as reported by the calendar service
//! - [`NewEvent`]: the payload used to create an event

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::{DateRange, EventTime};

/// The lifecycle status the service reports for an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
    #[default]
    Unknown,
}

impl EventStatus {
    /// Maps the service's status string, case-insensitively.
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "tentative" => Self::Tentative,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier assigned by the service. Absent until the event is stored.
    pub id: Option<String>,
    /// The event summary (title).
    pub summary: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Status reported by the service.
    pub status: EventStatus,
    /// Link to the event in the calendar web UI.
    pub html_link: Option<String>,
}

impl Event {
    /// Creates an event without an id.
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            id: None,
            summary: summary.into(),
            start,
            end,
            status: EventStatus::Unknown,
            html_link: None,
        }
    }

    /// Sets the service id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns true if both bounds lie inside `range`, reading all-day
    /// dates in `tz`.
    pub fn is_within(&self, range: &DateRange, tz: &Tz) -> bool {
        range.contains_event(&self.start, &self.end, tz)
    }
}

/// An event to be created on a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Timezone the service should attach to both bounds.
    pub timezone: Tz,
}

impl NewEvent {
    /// Creates an insert payload covering `range`.
    pub fn new(summary: impl Into<String>, range: DateRange, timezone: Tz) -> Self {
        Self {
            summary: summary.into(),
            start: range.start,
            end: range.end,
            timezone,
        }
    }

    /// Converts the payload into an [`Event`] with both bounds in the payload timezone.
    pub fn to_event(&self) -> Event {
        Event::new(
            self.summary.clone(),
            EventTime::from_instant(self.start.with_timezone(&self.timezone)),
            EventTime::from_instant(self.end.with_timezone(&self.timezone)),
        )
    }
}
