//! Router for the health check

use std::sync::Arc;

use axum::{Json, Router};
use serde_json::Value;

use crate::api::state::AppState;

type SharedState = Arc<AppState>;

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Create the health router
pub fn router() -> Router<SharedState> {
    Router::new().route("/health", axum::routing::get(health_handler))
}
