use std::env;

use axum_extra::extract::cookie::SameSite;
use thiserror::Error;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

// Key derivation for the private cookie jar needs at least this many bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Fourteen days
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing server configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

impl ConfigError {
    pub fn missing_keys(&self) -> &[&'static str] {
        match self {
            ConfigError::Missing(keys) => keys,
        }
    }
}

/// Where the Google endpoints live. Overridable so tests can point
/// everything at a local mock server.
#[derive(Clone, Debug)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub calendar_api_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            calendar_api_url: GOOGLE_CALENDAR_API_URL.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Point every endpoint at a single base url, keeping Google's paths.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            userinfo_url: format!("{}/oauth2/v2/userinfo", base),
            calendar_api_url: format!("{}/calendar/v3", base),
        }
    }
}

/// Raw server configuration as read from the environment. Required
/// values are optional here and checked by `validate`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
    pub google_calendar_id: Option<String>,
    pub session_password: Option<String>,
    pub frontend_origin: String,
    pub session_cookie_name: String,
    /// Max-Age of the session cookie. Zero makes it a browser-session cookie.
    pub session_ttl_seconds: i64,
    pub cookie_same_site: SameSite,
    pub cookie_secure: bool,
    pub endpoints: GoogleEndpoints,
}

/// Everything a protected route needs to talk to Google.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub calendar_id: String,
    pub endpoints: GoogleEndpoints,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_same_site(value: &str) -> SameSite {
    match value.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = GoogleEndpoints::default();
        let endpoints = GoogleEndpoints {
            auth_url: non_empty_var("GOOGLE_AUTH_URL").unwrap_or(defaults.auth_url),
            token_url: non_empty_var("GOOGLE_TOKEN_URL").unwrap_or(defaults.token_url),
            userinfo_url: non_empty_var("GOOGLE_USERINFO_URL").unwrap_or(defaults.userinfo_url),
            calendar_api_url: non_empty_var("GOOGLE_CALENDAR_API_URL")
                .unwrap_or(defaults.calendar_api_url),
        };
        let cookie_secure = non_empty_var("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            google_client_secret: non_empty_var("GOOGLE_CLIENT_SECRET"),
            google_redirect_uri: non_empty_var("GOOGLE_REDIRECT_URI"),
            google_calendar_id: non_empty_var("GOOGLE_CALENDAR_ID"),
            session_password: non_empty_var("SESSION_PASSWORD"),
            frontend_origin: non_empty_var("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            session_cookie_name: non_empty_var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "calendar_session".to_string()),
            session_ttl_seconds: non_empty_var("SESSION_TTL_SECONDS")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|ttl| *ttl >= 0)
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            cookie_same_site: non_empty_var("COOKIE_SAMESITE")
                .map(|v| parse_same_site(&v))
                .unwrap_or(SameSite::Lax),
            cookie_secure,
            endpoints,
        }
    }

    /// The session secret, if it is long enough to derive a cookie key from.
    pub fn session_secret(&self) -> Option<&str> {
        self.session_password
            .as_deref()
            .filter(|s| s.len() >= MIN_SESSION_SECRET_LEN)
    }

    /// Check that every required value is present. The error lists
    /// exactly the missing keys, in a stable order.
    pub fn validate(&self) -> Result<ProviderConfig, ConfigError> {
        let required = [
            ("GOOGLE_CLIENT_ID", self.google_client_id.is_some()),
            ("GOOGLE_CLIENT_SECRET", self.google_client_secret.is_some()),
            ("GOOGLE_REDIRECT_URI", self.google_redirect_uri.is_some()),
            ("GOOGLE_CALENDAR_ID", self.google_calendar_id.is_some()),
            ("SESSION_PASSWORD", self.session_secret().is_some()),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, present)| !present)
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(ProviderConfig {
            client_id: self.google_client_id.clone().unwrap_or_default(),
            client_secret: self.google_client_secret.clone().unwrap_or_default(),
            redirect_uri: self.google_redirect_uri.clone().unwrap_or_default(),
            calendar_id: self.google_calendar_id.clone().unwrap_or_default(),
            endpoints: self.endpoints.clone(),
        })
    }
}
