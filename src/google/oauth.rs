//! Google OAuth2 flow: consent url, code exchange, token refresh, and
//! the userinfo lookup used to cache the signed-in email.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{GoogleEndpoints, ProviderConfig};

pub const SCOPES: [&str; 3] = ["https://www.googleapis.com/auth/calendar", "openid", "email"];

// Refresh a little early so a token doesn't expire mid-request
const EXPIRY_MARGIN_SECONDS: i64 = 5 * 60;

/// Response body of the token endpoint for both the code exchange and
/// the refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

/// The delegated credential stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl TokenSet {
    pub fn from_response(resp: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at: resp.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: resp.scope,
            token_type: resp.token_type,
        }
    }

    /// A token without a known expiry is trusted until the provider says
    /// otherwise.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECONDS),
            None => false,
        }
    }

    /// Newly issued fields win. Google usually omits the refresh token on
    /// a refresh grant so the old one is kept.
    pub fn merged(&self, resp: TokenResponse, now: DateTime<Utc>) -> Self {
        let fresh = TokenSet::from_response(resp, now);
        Self {
            access_token: fresh.access_token,
            refresh_token: fresh.refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: fresh.expires_at.or(self.expires_at),
            scope: fresh.scope.or_else(|| self.scope.clone()),
            token_type: fresh.token_type.or_else(|| self.token_type.clone()),
        }
    }
}

/// Build the consent screen url. Offline access plus a forced consent
/// prompt makes Google issue a refresh token every time.
pub fn authorization_url(config: &ProviderConfig) -> String {
    let scope = SCOPES.join(" ");
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&include_granted_scopes=true",
        config.endpoints.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scope)
    )
}

async fn request_token(
    client: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let res = client.post(token_url).form(form).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorResponse>(&text) {
            Ok(TokenErrorResponse {
                error,
                error_description: Some(description),
            }) => format!("{}: {}", error, description),
            Ok(TokenErrorResponse { error, .. }) => error,
            Err(_) => format!("Token request failed: {} ({})", status, text),
        };
        return Err(anyhow!(message));
    }
    let token: TokenResponse = serde_json::from_str(&text)?;
    Ok(token)
}

pub async fn exchange_code_for_token(
    client: &Client,
    config: &ProviderConfig,
    code: &str,
) -> Result<TokenResponse> {
    request_token(
        client,
        &config.endpoints.token_url,
        &[
            ("code", code),
            ("client_id", &config.client_id),
            ("client_secret", &config.client_secret),
            ("redirect_uri", &config.redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub async fn refresh_access_token(
    client: &Client,
    config: &ProviderConfig,
    refresh_token: &str,
) -> Result<TokenResponse> {
    request_token(
        client,
        &config.endpoints.token_url,
        &[
            ("client_id", &config.client_id),
            ("client_secret", &config.client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

pub async fn fetch_user_email(
    client: &Client,
    endpoints: &GoogleEndpoints,
    access_token: &str,
) -> Result<Option<String>> {
    let res = client
        .get(&endpoints.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Userinfo fetch failed: {} ({})", status, text);
    }
    let info: UserInfo = serde_json::from_str(&text)?;
    Ok(info.email)
}
