//! Google Calendar API v3 client.
//!
//! Low-level HTTP calls for listing, inserting and deleting events. The
//! access token is passed per call so the provider stays in charge of
//! refreshing it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calbook_core::{Event, EventStatus, EventTime, NewEvent};
use chrono::{DateTime, NaiveDate, TimeDelta};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::EventQuery;

/// Google caps `maxResults` at 2500 per page.
const MAX_PAGE_SIZE: usize = 2500;

/// The service treats `timeMin`/`timeMax` as exclusive; the query bounds
/// are inclusive, so requests are widened by this much and filtered locally.
const BOUND_SLACK: TimeDelta = TimeDelta::seconds(1);

/// Error reasons Google uses when the token lacks a scope.
const SCOPE_REASONS: &[&str] = &["insufficientPermissions", "ACCESS_TOKEN_SCOPE_INSUFFICIENT"];

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
    /// Token file named in re-authorization hints.
    token_path: PathBuf,
}

impl GoogleCalendarClient {
    pub fn new(
        api_base: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_path: token_path.into(),
        }
    }

    /// Lists events, following `nextPageToken` until exhausted or
    /// `max_results` events were collected.
    ///
    /// Only events passing [`EventQuery::matches`] are returned.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> ProviderResult<Vec<Event>> {
        let url = self.events_url(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let params = list_params(query, page_token.as_deref());
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(access_token)
                .query(&params)
                .send()
                .await
                .map_err(request_error)?;
            let page: EventListResponse = self.read_json(response).await?;

            events.extend(matching_events(page.items, query));

            if let Some(max) = query.max_results {
                if events.len() >= max {
                    events.truncate(max);
                    break;
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "listed events");
        Ok(events)
    }

    /// Inserts an event and returns it as stored by Google.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> ProviderResult<Event> {
        let body = InsertBody::from(event);
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let created: ApiEvent = self.read_json(response).await?;

        let link = created.html_link.clone();
        let event = convert_event(created).ok_or_else(|| {
            ProviderError::invalid_response("created event is missing its start or end")
        })?;
        info!(calendar_id, id = ?event.id, link = ?link, "created event");
        Ok(event)
    }

    /// Deletes an event. An event that is already gone (410) counts as deleted.
    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> ProviderResult<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::GONE {
            info!(calendar_id, event_id, "deleted event");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body, &self.token_path))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, &self.token_path));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Tells the operator how to recover from a token without the needed scopes.
pub fn reauth_hint(token_path: &Path) -> String {
    format!(
        "delete {} and run `calbook auth google` again to grant the required scopes",
        token_path.display()
    )
}

/// Converts one page of items, dropping those outside the query bounds.
fn matching_events(items: Vec<ApiEvent>, query: &EventQuery) -> Vec<Event> {
    items
        .into_iter()
        .filter_map(convert_event)
        .filter(|event| query.matches(event))
        .collect()
}

/// Query parameters for one page of `events.list`.
fn list_params(query: &EventQuery, page_token: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(min) = query.time_min {
        params.push(("timeMin", (min - BOUND_SLACK).to_rfc3339()));
    }
    if let Some(max) = query.time_max {
        params.push(("timeMax", (max + BOUND_SLACK).to_rfc3339()));
    }
    if let Some(max) = query.max_results {
        params.push(("maxResults", max.clamp(1, MAX_PAGE_SIZE).to_string()));
    }
    if query.single_events {
        params.push(("singleEvents", "true".to_string()));
        if query.order_by_start {
            params.push(("orderBy", "startTime".to_string()));
        }
    }
    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }
    params
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Maps a non-success status to a provider error.
fn status_error(status: StatusCode, body: &str, token_path: &Path) -> ProviderError {
    let detail = serde_json::from_str::<ApiErrorBody>(body).ok();
    let message = detail
        .as_ref()
        .map(|d| d.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let error = match status {
        StatusCode::UNAUTHORIZED => ProviderError::authentication(format!(
            "access token expired or invalid ({})",
            message
        )),
        StatusCode::FORBIDDEN => {
            let scope_problem = detail.as_ref().is_some_and(ApiErrorBody::is_scope_problem);
            if scope_problem {
                ProviderError::authorization(format!(
                    "insufficient permissions: {}; {}",
                    message,
                    reauth_hint(token_path)
                ))
            } else {
                ProviderError::authorization(format!("access denied: {}", message))
            }
        }
        StatusCode::NOT_FOUND => ProviderError::not_found(format!("not found: {}", message)),
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited(format!("rate limit exceeded: {}", message))
        }
        s if s.is_server_error() => {
            ProviderError::server(format!("API error ({}): {}", status, message))
        }
        _ => ProviderError::bad_request(format!("API error ({}): {}", status, message)),
    };
    error.with_provider("google")
}

/// Converts an API event, skipping cancelled ones and ones without usable times.
fn convert_event(event: ApiEvent) -> Option<Event> {
    let status = event
        .status
        .as_deref()
        .map(EventStatus::from_api)
        .unwrap_or_default();
    if status == EventStatus::Cancelled {
        return None;
    }

    let label = event.id.as_deref().unwrap_or("<no id>");
    let start = parse_time(&event.start, "start", label)?;
    let end = parse_time(&event.end, "end", label)?;

    let mut converted = Event::new(event.summary.unwrap_or_default(), start, end).with_status(status);
    converted.id = event.id;
    converted.html_link = event.html_link;
    Some(converted)
}

fn parse_time(time: &ApiEventTime, which: &str, event_id: &str) -> Option<EventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => match DateTime::parse_from_rfc3339(dt) {
            Ok(parsed) => Some(EventTime::DateTime(parsed)),
            Err(e) => {
                warn!(event_id, "skipping event with bad {} time {:?}: {}", which, dt, e);
                None
            }
        },
        (None, Some(date)) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(parsed) => Some(EventTime::AllDay(parsed)),
            Err(e) => {
                warn!(event_id, "skipping event with bad {} date {:?}: {}", which, date, e);
                None
            }
        },
        (None, None) => {
            warn!(event_id, "skipping event without {} time", which);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

/// Body of `events.insert`.
#[derive(Debug, Serialize)]
struct InsertBody {
    summary: String,
    start: ApiEventTime,
    end: ApiEventTime,
}

impl From<&NewEvent> for InsertBody {
    fn from(event: &NewEvent) -> Self {
        let time = |instant: DateTime<chrono::Utc>| ApiEventTime {
            date: None,
            date_time: Some(instant.with_timezone(&event.timezone).to_rfc3339()),
            time_zone: Some(event.timezone.name().to_string()),
        };
        Self {
            summary: event.summary.clone(),
            start: time(event.start),
            end: time(event.end),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    details: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: Option<String>,
}

impl ApiErrorBody {
    fn is_scope_problem(&self) -> bool {
        self.error
            .errors
            .iter()
            .chain(self.error.details.iter())
            .filter_map(|item| item.reason.as_deref())
            .any(|reason| SCOPE_REASONS.contains(&reason))
            || self.error.message.contains("insufficient authentication scopes")
            || self.error.status.as_deref() == Some("ACCESS_TOKEN_SCOPE_INSUFFICIENT")
    }
}
