use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use http::HeaderMap;
use reqwest::Client;

use crate::core::{AppConfig, ConfigError, ProviderConfig};

pub struct AppState {
    pub config: AppConfig,
    // Validated once at startup, protected routes answer with the error
    pub provider: Result<ProviderConfig, ConfigError>,
    pub cookie_key: Key,
    pub http: Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let provider = config.validate();
        if let Err(err) = &provider {
            tracing::error!("{}. Protected routes will fail until this is fixed.", err);
        }

        // Without a usable secret nothing can be decrypted across
        // restarts, a throwaway key keeps the public routes working.
        let cookie_key = match config.session_secret() {
            Some(secret) => Key::derive_from(secret.as_bytes()),
            None => Key::generate(),
        };

        Self {
            config,
            provider,
            cookie_key,
            http: Client::new(),
        }
    }

    pub fn cookie_jar(&self, headers: &HeaderMap) -> PrivateCookieJar {
        PrivateCookieJar::from_headers(headers, self.cookie_key.clone())
    }
}
