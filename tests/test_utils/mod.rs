//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::SameSite;
use mockito::{Matcher, Mock, ServerGuard};
use tower::util::ServiceExt;

use calproxy::api::AppState;
use calproxy::api::app;
use calproxy::core::{AppConfig, GoogleEndpoints};

pub const COOKIE_NAME: &str = "calendar_session";
pub const FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// A fully configured app whose Google endpoints all point at `base_url`.
pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        google_client_id: Some(String::from("test_client_id")),
        google_client_secret: Some(String::from("test_client_secret")),
        google_redirect_uri: Some(String::from("http://localhost:4000/auth/google/callback")),
        google_calendar_id: Some(String::from("primary")),
        session_password: Some(String::from("test-session-password-that-is-long-enough")),
        frontend_origin: String::from(FRONTEND_ORIGIN),
        session_cookie_name: String::from(COOKIE_NAME),
        session_ttl_seconds: 3600,
        cookie_same_site: SameSite::Lax,
        cookie_secure: false,
        endpoints: GoogleEndpoints::with_base_url(base_url),
    }
}

/// Creates a test application router from the config.
pub fn test_app(config: AppConfig) -> Router {
    app(Arc::new(AppState::new(config)))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}

/// The `name=value` pair of the session cookie set by a response, if any.
pub fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", COOKIE_NAME)))
        .and_then(|v| v.split(';').next())
        .map(String::from)
}

pub fn mock_code_exchange(server: &mut ServerGuard, expires_in: i64) -> Mock {
    server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "authorization_code".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "access_token": "initial-access",
                "refresh_token": "initial-refresh",
                "expires_in": expires_in,
                "scope": "https://www.googleapis.com/auth/calendar openid email",
                "token_type": "Bearer",
            })
            .to_string(),
        )
        .create()
}

pub fn mock_userinfo(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/oauth2/v2/userinfo")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "42", "email": "me@example.com"}"#)
        .create()
}

/// Run the OAuth callback against the mock server and return the session
/// cookie to send on later requests. `expires_in` controls how long the
/// initial access token is valid.
pub async fn login(app: &Router, server: &mut ServerGuard, expires_in: i64) -> String {
    let _exchange = mock_code_exchange(server, expires_in);
    let _userinfo = mock_userinfo(server);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/google/callback?code=test-code")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response).expect("callback should set a session cookie")
}
