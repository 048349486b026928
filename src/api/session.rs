//! Cookie-backed sessions holding the delegated Google credential.
//!
//! The whole `Session` record is serialized into a private (encrypted)
//! cookie. A refresh never edits a session in place, it produces the
//! next revision which the handler writes back with its response.

use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use chrono::{DateTime, Utc};
use http::request::Parts;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::public::ApiError;
use super::state::AppState;
use crate::core::{AppConfig, ProviderConfig};
use crate::google::oauth::{TokenResponse, TokenSet, refresh_access_token};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub revision: u64,
    pub tokens: TokenSet,
    pub email: Option<String>,
}

impl Session {
    pub fn new(tokens: TokenSet, email: Option<String>) -> Self {
        Self {
            revision: 0,
            tokens,
            email,
        }
    }

    /// The next revision of this session with the refreshed token fields
    /// merged in.
    pub fn refreshed(&self, resp: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            revision: self.revision + 1,
            tokens: self.tokens.merged(resp, now),
            email: self.email.clone(),
        }
    }

    /// Read the session from the jar. A cookie that fails to decrypt or
    /// parse is treated the same as no cookie.
    pub fn from_jar(jar: &PrivateCookieJar, cookie_name: &str) -> Option<Self> {
        let cookie = jar.get(cookie_name)?;
        match serde_json::from_str(cookie.value()) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!("Ignoring unreadable session cookie: {}", err);
                None
            }
        }
    }

    pub fn store(
        &self,
        jar: PrivateCookieJar,
        config: &AppConfig,
    ) -> Result<PrivateCookieJar, serde_json::Error> {
        let value = serde_json::to_string(self)?;
        let mut cookie = Cookie::build((config.session_cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(config.cookie_secure)
            .same_site(config.cookie_same_site);
        if config.session_ttl_seconds > 0 {
            cookie = cookie.max_age(time::Duration::seconds(config.session_ttl_seconds));
        }
        Ok(jar.add(cookie))
    }
}

pub fn clear_session(jar: PrivateCookieJar, config: &AppConfig) -> PrivateCookieJar {
    jar.remove(Cookie::build((config.session_cookie_name.clone(), "")).path("/"))
}

/// Make sure the session holds a usable access token, refreshing it
/// with the stored refresh token when it is stale.
pub async fn ensure_fresh(
    client: &Client,
    provider: &ProviderConfig,
    session: Session,
    now: DateTime<Utc>,
) -> anyhow::Result<Session> {
    if !session.tokens.is_stale(now) {
        return Ok(session);
    }
    let refresh_token = session
        .tokens
        .refresh_token
        .as_deref()
        .ok_or_else(|| anyhow!("No refresh token is set."))?;

    tracing::debug!("Refreshing access token (revision {})", session.revision);
    let resp = refresh_access_token(client, provider, refresh_token).await?;
    Ok(session.refreshed(resp, now))
}

/// A request that has passed both gates of a protected route: the server
/// is fully configured and the caller has a session. Configuration is
/// checked first.
pub struct Authorized {
    pub provider: ProviderConfig,
    pub session: Session,
    pub jar: PrivateCookieJar,
}

impl Authorized {
    /// Refresh the credential if needed and write the resulting session
    /// back into the jar so it is persisted with the response.
    pub async fn fresh(
        self,
        state: &AppState,
    ) -> Result<(ProviderConfig, Session, PrivateCookieJar), ApiError> {
        let Authorized {
            provider,
            session,
            jar,
        } = self;
        let revision = session.revision;
        let session = ensure_fresh(&state.http, &provider, session, Utc::now()).await?;
        let jar = if session.revision != revision {
            session.store(jar, &state.config)?
        } else {
            jar
        };
        Ok((provider, session, jar))
    }
}

impl FromRequestParts<Arc<AppState>> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let provider = state.provider.clone()?;
        let jar = state.cookie_jar(&parts.headers);
        let session = Session::from_jar(&jar, &state.config.session_cookie_name)
            .ok_or(ApiError::Unauthenticated)?;
        Ok(Self {
            provider,
            session,
            jar,
        })
    }
}

/// Gate for routes that only need the server to be configured.
pub struct Configured(pub ProviderConfig);

impl FromRequestParts<Arc<AppState>> for Configured {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.provider.clone()?))
    }
}
