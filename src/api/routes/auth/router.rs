//! Router for the auth API

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::Redirect,
};
use axum_extra::extract::{Query, cookie::PrivateCookieJar};
use chrono::Utc;
use http::HeaderMap;
use serde_json::Value;

use super::public;
use crate::api::public::ApiError;
use crate::api::session::{Configured, Session, clear_session};
use crate::api::state::AppState;
use crate::google::oauth::{
    TokenSet, authorization_url, exchange_code_for_token, fetch_user_email,
};

type SharedState = Arc<AppState>;

// Send the browser to Google's consent screen
async fn login_handler(Configured(provider): Configured) -> Redirect {
    Redirect::to(&authorization_url(&provider))
}

async fn callback_handler(
    State(state): State<SharedState>,
    Configured(provider): Configured,
    headers: HeaderMap,
    Query(params): Query<public::CallbackQuery>,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::BadRequest(String::from("Missing code")))?;

    let token = exchange_code_for_token(&state.http, &provider, &code).await?;
    let tokens = TokenSet::from_response(token, Utc::now());
    let email = fetch_user_email(&state.http, &provider.endpoints, &tokens.access_token).await?;

    if tokens.refresh_token.is_none() {
        tracing::warn!("Google did not issue a refresh token, the session will not outlive the access token");
    }
    tracing::info!("Signed in {}", email.as_deref().unwrap_or("unknown user"));

    let session = Session::new(tokens, email);
    let jar = session.store(state.cookie_jar(&headers), &state.config)?;

    Ok((jar, Redirect::to(&state.config.frontend_origin)))
}

// Report who is signed in without calling Google
async fn me_handler(State(state): State<SharedState>, headers: HeaderMap) -> Json<public::AuthStatus> {
    let jar = state.cookie_jar(&headers);
    let status = match Session::from_jar(&jar, &state.config.session_cookie_name) {
        Some(session) => public::AuthStatus {
            authenticated: true,
            email: session.email,
        },
        None => public::AuthStatus {
            authenticated: false,
            email: None,
        },
    };
    Json(status)
}

async fn logout_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> (PrivateCookieJar, Json<Value>) {
    let jar = clear_session(state.cookie_jar(&headers), &state.config);
    (jar, Json(serde_json::json!({ "ok": true })))
}

/// Create the auth router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/google", axum::routing::get(login_handler))
        .route("/google/callback", axum::routing::get(callback_handler))
        .route("/me", axum::routing::get(me_handler))
        .route("/logout", axum::routing::post(logout_handler))
}
