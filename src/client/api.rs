//! HTTP client for the proxy's JSON API, used by the calendar view and
//! the editor.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::api::public::auth::AuthStatus;
use crate::api::public::events::{CalendarEvent, EventPayload};

/// The event operations the view and editor need. Implemented over HTTP
/// by `ApiClient`.
#[async_trait]
pub trait EventsApi: Send + Sync {
    async fn list_events(&self, start: DateTime<Utc>, end: DateTime<Utc>)
    -> Result<Vec<CalendarEvent>>;
    async fn create_event(&self, payload: &EventPayload) -> Result<CalendarEvent>;
    async fn update_event(&self, id: &str, payload: &EventPayload) -> Result<CalendarEvent>;
    async fn delete_event(&self, id: &str) -> Result<()>;
}

pub struct ApiClient {
    base_url: String,
    http: Client,
}

async fn handle_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    if !status.is_success() {
        let message = res.text().await.unwrap_or_default();
        if message.is_empty() {
            bail!("Request failed: {}", status.as_u16());
        }
        bail!(message);
    }
    Ok(res.json().await?)
}

impl ApiClient {
    /// Client with its own cookie store so the session cookie set by the
    /// login callback is sent back on every call.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Where to send the browser to sign in.
    pub fn login_url(&self) -> String {
        format!("{}/auth/google", self.base_url)
    }

    pub async fn auth_status(&self) -> Result<AuthStatus> {
        let res = self
            .http
            .get(format!("{}/auth/me", self.base_url))
            .send()
            .await?;
        handle_json(res).await
    }

    pub async fn logout(&self) -> Result<()> {
        let res = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .send()
            .await?;
        let _: serde_json::Value = handle_json(res).await?;
        Ok(())
    }
}

#[async_trait]
impl EventsApi for ApiClient {
    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let res = self
            .http
            .get(format!("{}/events", self.base_url))
            .query(&[
                ("start", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("end", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ])
            .send()
            .await?;
        handle_json(res).await
    }

    async fn create_event(&self, payload: &EventPayload) -> Result<CalendarEvent> {
        let res = self
            .http
            .post(format!("{}/events", self.base_url))
            .json(payload)
            .send()
            .await?;
        handle_json(res).await
    }

    async fn update_event(&self, id: &str, payload: &EventPayload) -> Result<CalendarEvent> {
        let res = self
            .http
            .patch(format!(
                "{}/events/{}",
                self.base_url,
                urlencoding::encode(id)
            ))
            .json(payload)
            .send()
            .await?;
        handle_json(res).await
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let res = self
            .http
            .delete(format!(
                "{}/events/{}",
                self.base_url,
                urlencoding::encode(id)
            ))
            .send()
            .await?;
        let _: serde_json::Value = handle_json(res).await?;
        Ok(())
    }
}
