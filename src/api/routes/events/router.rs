//! Router for the events API

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
};
use axum_extra::extract::{Query, cookie::PrivateCookieJar};
use serde_json::Value;

use super::public;
use crate::api::public::ApiError;
use crate::api::session::Authorized;
use crate::api::state::AppState;
use crate::google::gcal::{
    AttendeeWrite, EventTimeWrite, EventWrite, delete_event, insert_event, list_events,
    patch_event,
};

type SharedState = Arc<AppState>;

/// A refreshed session goes out with the response even when the Google
/// call fails, so the next request doesn't refresh again.
type WithSession<T> = Result<(PrivateCookieJar, Result<Json<T>, ApiError>), ApiError>;

impl From<public::EventPayload> for EventWrite {
    fn from(payload: public::EventPayload) -> Self {
        Self {
            summary: payload.title,
            description: payload.description.unwrap_or_default(),
            attendees: payload
                .attendees
                .unwrap_or_default()
                .into_iter()
                .map(|email| AttendeeWrite { email })
                .collect(),
            start: EventTimeWrite::utc(payload.start_utc),
            end: EventTimeWrite::utc(payload.end_utc),
        }
    }
}

async fn list_handler(
    State(state): State<SharedState>,
    auth: Authorized,
    Query(params): Query<public::EventsQuery>,
) -> WithSession<Vec<public::CalendarEvent>> {
    let (provider, session, jar) = auth.fresh(&state).await?;
    let events = list_events(
        &state.http,
        &provider.endpoints.calendar_api_url,
        &session.tokens.access_token,
        &provider.calendar_id,
        params.start,
        params.end,
    )
    .await
    .map(Json)
    .map_err(ApiError::from);

    Ok((jar, events))
}

async fn create_handler(
    State(state): State<SharedState>,
    auth: Authorized,
    Json(payload): Json<public::EventPayload>,
) -> WithSession<public::CalendarEvent> {
    let (provider, session, jar) = auth.fresh(&state).await?;
    let event = insert_event(
        &state.http,
        &provider.endpoints.calendar_api_url,
        &session.tokens.access_token,
        &provider.calendar_id,
        &payload.into(),
    )
    .await
    .map(|event| {
        tracing::info!("Created event {}", event.id);
        Json(event)
    })
    .map_err(ApiError::from);

    Ok((jar, event))
}

async fn update_handler(
    State(state): State<SharedState>,
    auth: Authorized,
    Path(id): Path<String>,
    Json(payload): Json<public::EventPayload>,
) -> WithSession<public::CalendarEvent> {
    let (provider, session, jar) = auth.fresh(&state).await?;
    let event = patch_event(
        &state.http,
        &provider.endpoints.calendar_api_url,
        &session.tokens.access_token,
        &provider.calendar_id,
        &id,
        &payload.into(),
    )
    .await
    .map(|event| {
        tracing::info!("Updated event {}", event.id);
        Json(event)
    })
    .map_err(ApiError::from);

    Ok((jar, event))
}

async fn delete_handler(
    State(state): State<SharedState>,
    auth: Authorized,
    Path(id): Path<String>,
) -> WithSession<Value> {
    let (provider, session, jar) = auth.fresh(&state).await?;
    let deleted = delete_event(
        &state.http,
        &provider.endpoints.calendar_api_url,
        &session.tokens.access_token,
        &provider.calendar_id,
        &id,
    )
    .await
    .map(|_| {
        tracing::info!("Deleted event {}", id);
        Json(serde_json::json!({ "ok": true }))
    })
    .map_err(ApiError::from);

    Ok((jar, deleted))
}

/// Create the events router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/",
            axum::routing::get(list_handler).post(create_handler),
        )
        .route(
            "/{id}",
            axum::routing::patch(update_handler).delete(delete_handler),
        )
}
