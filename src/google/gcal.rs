//! Google Calendar v3 client for the handful of event calls the proxy
//! forwards, plus the projection of Google's event JSON into
//! `CalendarEvent`.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::api::public::events::CalendarEvent;

pub const UNTITLED_EVENT: &str = "(No title)";

const PAGE_SIZE: &str = "250";

// Google's event resource. Everything is optional because Google omits
// fields freely (cancelled instances carry little more than an id).

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub attendees: Option<Vec<GoogleAttendee>>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAttendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEventsResponse {
    items: Option<Vec<GoogleEvent>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

/// Request body for insert and patch. Every field is always sent so a
/// patch replaces the whole event.
#[derive(Debug, Clone, Serialize)]
pub struct EventWrite {
    pub summary: String,
    pub description: String,
    pub attendees: Vec<AttendeeWrite>,
    pub start: EventTimeWrite,
    pub end: EventTimeWrite,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendeeWrite {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTimeWrite {
    pub date_time: DateTime<Utc>,
    pub time_zone: String,
}

impl EventTimeWrite {
    pub fn utc(date_time: DateTime<Utc>) -> Self {
        Self {
            date_time,
            time_zone: String::from("UTC"),
        }
    }
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

fn normalize_time(time: Option<&GoogleEventTime>, field: &str) -> Result<DateTime<Utc>> {
    let time = time.ok_or_else(|| anyhow!("Event is missing its {} time", field))?;
    if let Some(date_time) = &time.date_time {
        let parsed = DateTime::parse_from_rfc3339(date_time)
            .map_err(|e| anyhow!("Invalid {} dateTime {}: {}", field, date_time, e))?;
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Some(date) = &time.date {
        // All-day events only carry a date, pin them to midnight UTC
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| anyhow!("Invalid {} date {}: {}", field, date, e))?;
        return Ok(parsed.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(anyhow!("Event {} time has neither dateTime nor date", field))
}

/// Project a Google event into the stable `CalendarEvent` shape.
pub fn normalize_event(event: GoogleEvent) -> Result<CalendarEvent> {
    let id = event.id.clone().ok_or_else(|| anyhow!("Event is missing an id"))?;
    let start_utc = normalize_time(event.start.as_ref(), "start")?;
    let end_utc = normalize_time(event.end.as_ref(), "end")?;
    let title = event
        .summary
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED_EVENT.to_string());
    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.email.filter(|e| !e.is_empty()))
        .collect();

    Ok(CalendarEvent {
        id,
        title,
        description: event.description.unwrap_or_default(),
        attendees,
        start_utc,
        end_utc,
    })
}

fn events_url(calendar_api_url: &str, calendar_id: &str) -> String {
    format!(
        "{}/calendars/{}/events",
        calendar_api_url.trim_end_matches('/'),
        urlencoding::encode(calendar_id)
    )
}

fn event_url(calendar_api_url: &str, calendar_id: &str, event_id: &str) -> String {
    format!(
        "{}/{}",
        events_url(calendar_api_url, calendar_id),
        urlencoding::encode(event_id)
    )
}

/// Turn a non-2xx response into an error carrying Google's message.
async fn check_response(res: Response, action: &str) -> Result<String> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        let message = serde_json::from_str::<GoogleErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("{} failed: {} ({})", action, status, text));
        return Err(anyhow!(message));
    }
    Ok(text)
}

/// List every non-cancelled event instance in the window, recurring
/// events expanded, ordered by start time. Follows all result pages.
/// Items without a usable id or time are skipped.
pub async fn list_events(
    client: &Client,
    calendar_api_url: &str,
    access_token: &str,
    calendar_id: &str,
    time_min: Option<DateTime<Utc>>,
    time_max: Option<DateTime<Utc>>,
) -> Result<Vec<CalendarEvent>> {
    let url = events_url(calendar_api_url, calendar_id);
    let mut events = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query: Vec<(&str, String)> = vec![
            ("singleEvents", String::from("true")),
            ("orderBy", String::from("startTime")),
            ("maxResults", String::from(PAGE_SIZE)),
        ];
        if let Some(time_min) = time_min {
            query.push(("timeMin", time_min.to_rfc3339()));
        }
        if let Some(time_max) = time_max {
            query.push(("timeMax", time_max.to_rfc3339()));
        }
        if let Some(token) = &page_token {
            query.push(("pageToken", token.clone()));
        }

        let res = client
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;
        let text = check_response(res, "Event list").await?;
        let page: ListEventsResponse = serde_json::from_str(&text)?;

        for event in page.items.unwrap_or_default() {
            if event.is_cancelled() {
                continue;
            }
            let id = event.id.clone().unwrap_or_default();
            match normalize_event(event) {
                Ok(event) => events.push(event),
                // One unreadable item shouldn't hide the rest of the window
                Err(err) => tracing::warn!("Skipping event {}: {}", id, err),
            }
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    tracing::debug!("Listed {} events from {}", events.len(), calendar_id);
    Ok(events)
}

pub async fn insert_event(
    client: &Client,
    calendar_api_url: &str,
    access_token: &str,
    calendar_id: &str,
    body: &EventWrite,
) -> Result<CalendarEvent> {
    let res = client
        .post(events_url(calendar_api_url, calendar_id))
        .bearer_auth(access_token)
        .json(body)
        .send()
        .await?;
    let text = check_response(res, "Event insert").await?;
    let event: GoogleEvent = serde_json::from_str(&text)?;
    normalize_event(event)
}

pub async fn patch_event(
    client: &Client,
    calendar_api_url: &str,
    access_token: &str,
    calendar_id: &str,
    event_id: &str,
    body: &EventWrite,
) -> Result<CalendarEvent> {
    let res = client
        .patch(event_url(calendar_api_url, calendar_id, event_id))
        .bearer_auth(access_token)
        .json(body)
        .send()
        .await?;
    let text = check_response(res, "Event update").await?;
    let event: GoogleEvent = serde_json::from_str(&text)?;
    normalize_event(event)
}

pub async fn delete_event(
    client: &Client,
    calendar_api_url: &str,
    access_token: &str,
    calendar_id: &str,
    event_id: &str,
) -> Result<()> {
    let res = client
        .delete(event_url(calendar_api_url, calendar_id, event_id))
        .bearer_auth(access_token)
        .send()
        .await?;
    check_response(res, "Event delete").await?;
    Ok(())
}
