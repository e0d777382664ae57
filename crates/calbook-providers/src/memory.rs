//! In-memory calendar provider.
//!
//! [`MemoryProvider`] keeps events per calendar in insertion order and
//! records every insert and delete it receives. It backs the glue tests and
//! is handy for dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use calbook_core::{Event, NewEvent};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, EventQuery};

#[derive(Debug, Default)]
struct State {
    calendars: HashMap<String, Vec<Event>>,
    inserts: Vec<(String, NewEvent)>,
    deletes: Vec<(String, String)>,
    queries: Vec<EventQuery>,
    next_id: u64,
    failure: Option<ProviderError>,
}

impl State {
    fn check_failure(&self) -> ProviderResult<()> {
        match &self.failure {
            Some(error) => Err(error.detached()),
            None => Ok(()),
        }
    }

    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }
}

/// A calendar provider that stores everything in memory.
#[derive(Debug)]
pub struct MemoryProvider {
    state: Mutex<State>,
    supports_delete: bool,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            supports_delete: true,
        }
    }

    /// Creates a provider whose `delete_event` reports `Unsupported`.
    pub fn without_delete() -> Self {
        Self {
            supports_delete: false,
            ..Self::new()
        }
    }

    /// Seeds an event on `calendar_id`. Events without an id keep none.
    pub fn with_event(self, calendar_id: impl Into<String>, event: Event) -> Self {
        self.add_event(calendar_id, event);
        self
    }

    /// Appends an existing event to `calendar_id`.
    pub fn add_event(&self, calendar_id: impl Into<String>, event: Event) {
        self.lock()
            .calendars
            .entry(calendar_id.into())
            .or_default()
            .push(event);
    }

    /// Makes every subsequent call fail with a copy of `error`.
    pub fn fail_with(&self, error: ProviderError) {
        self.lock().failure = Some(error);
    }

    /// Clears a failure set with [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Returns the events currently stored on `calendar_id`.
    pub fn events(&self, calendar_id: &str) -> Vec<Event> {
        self.lock()
            .calendars
            .get(calendar_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every insert received, as `(calendar_id, payload)`.
    pub fn inserts(&self) -> Vec<(String, NewEvent)> {
        self.lock().inserts.clone()
    }

    /// Returns every successful delete, as `(calendar_id, event_id)`.
    pub fn deletes(&self) -> Vec<(String, String)> {
        self.lock().deletes.clone()
    }

    /// Returns every listing query received.
    pub fn queries(&self) -> Vec<EventQuery> {
        self.lock().queries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_now(&self, calendar_id: &str, query: EventQuery) -> ProviderResult<Vec<Event>> {
        let mut state = self.lock();
        state.check_failure()?;
        state.queries.push(query.clone());

        let mut events: Vec<Event> = state
            .calendars
            .get(calendar_id)
            .map(|events| events.iter().filter(|e| query.matches(e)).cloned().collect())
            .unwrap_or_default();

        if query.single_events && query.order_by_start {
            events.sort_by(|a, b| a.start.cmp(&b.start));
        }
        if let Some(max) = query.max_results {
            events.truncate(max);
        }

        debug!(calendar_id, count = events.len(), "memory: listed events");
        Ok(events)
    }

    fn insert_now(&self, calendar_id: &str, new_event: &NewEvent) -> ProviderResult<Event> {
        let mut state = self.lock();
        state.check_failure()?;

        let id = state.assign_id();
        let event = new_event.to_event().with_id(id);
        state
            .inserts
            .push((calendar_id.to_string(), new_event.clone()));
        state
            .calendars
            .entry(calendar_id.to_string())
            .or_default()
            .push(event.clone());

        debug!(calendar_id, id = ?event.id, "memory: inserted event");
        Ok(event)
    }

    fn delete_now(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let mut state = self.lock();
        state.check_failure()?;

        let events = state.calendars.entry(calendar_id.to_string()).or_default();
        let before = events.len();
        events.retain(|e| e.id.as_deref() != Some(event_id));
        if events.len() == before {
            return Err(ProviderError::not_found(format!(
                "event {event_id} not found in calendar {calendar_id}"
            ))
            .with_provider("memory"));
        }

        state
            .deletes
            .push((calendar_id.to_string(), event_id.to_string()));
        debug!(calendar_id, event_id, "memory: deleted event");
        Ok(())
    }
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        query: EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        let result = self.list_now(calendar_id, query);
        Box::pin(async move { result })
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        let result = self.insert_now(calendar_id, event);
        Box::pin(async move { result })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let result = if self.supports_delete {
            self.delete_now(calendar_id, event_id)
        } else {
            Err(ProviderError::unsupported("deleting events is not supported by this provider")
                .with_provider(self.name()))
        };
        Box::pin(async move { result })
    }
}
