//! OAuth2 client-credentials token for exchange-authenticated registries
//!
//! The token is refreshed lazily: expiry is checked on every access and no
//! background timer exists. The lock is held across the token request so
//! concurrent callers wait for one refresh instead of each issuing their own.

use crate::registry::{send_json, SearchError};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

/// Validity assumed when the token endpoint omits `expires_in`
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// A bearer token and the instant it stops being usable
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AuthToken {
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Client credentials for the token endpoint
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

pub struct TokenManager {
    http: reqwest::Client,
    credentials: ClientCredentials,
    timeout: Duration,
    token: Mutex<Option<AuthToken>>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, credentials: ClientCredentials, timeout: Duration) -> Self {
        Self {
            http,
            credentials,
            timeout,
            token: Mutex::new(None),
        }
    }

    /// Current bearer token, requesting a new one if none is held or it expired
    pub async fn bearer(&self) -> Result<String, SearchError> {
        let mut held = self.token.lock().await;

        if let Some(token) = held.as_ref() {
            if token.is_valid_at(Instant::now()) {
                return Ok(token.value.clone());
            }
            debug!("bearer token expired");
        }
        *held = None;

        let token = self.request_token().await?;
        let value = token.value.clone();
        *held = Some(token);
        Ok(value)
    }

    /// Drop the held token if it is still `rejected`, so the next call
    /// requests a fresh one. A newer token obtained meanwhile is kept.
    pub async fn invalidate(&self, rejected: &str) {
        let mut held = self.token.lock().await;
        if held.as_ref().is_some_and(|t| t.value == rejected) {
            *held = None;
        }
    }

    async fn request_token(&self) -> Result<AuthToken, SearchError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.credentials.scope.as_str()),
        ];
        let request = self
            .http
            .post(self.credentials.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form);

        let body = send_json(request, self.timeout)
            .await
            .map_err(|e| match e {
                // A rejected token request is a credentials problem
                SearchError::Rejected { status, .. } => {
                    SearchError::Auth(format!("token endpoint returned {}", status))
                }
                other => other,
            })?;

        let response: TokenResponse = serde_json::from_value(body)
            .map_err(|e| SearchError::Parse(format!("token response: {}", e)))?;
        if response.access_token.is_empty() {
            return Err(SearchError::Auth("token endpoint returned an empty token".to_string()));
        }

        let ttl = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        info!(ttl_secs = ttl.as_secs(), "obtained bearer token");

        Ok(AuthToken {
            value: response.access_token,
            expires_at: Instant::now() + ttl,
        })
    }
}
