//! Core types: event times, date ranges, events, listing output, tracing

pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::{Event, EventStatus, NewEvent};
pub use format::{event_line, write_events, write_upcoming};
pub use time::{DateRange, EventTime, TimeError, parse_instant, parse_timezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
