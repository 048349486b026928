//! API routes module

pub mod auth;
pub mod events;
mod health;

use std::sync::Arc;

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<AppState>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Liveness
        .merge(health::router())
        // OAuth login flow and session identity
        .nest("/auth", auth::router())
        // Calendar proxy
        .nest("/events", events::router())
}
