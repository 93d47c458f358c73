//! OAuth2 `refresh_token` grant against the Microsoft identity platform.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::token::{expires_at_from_now, TokenRecord, DEFAULT_EXPIRES_IN_SECS};

pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound accepted for a provider-supplied `expires_in` (one day).
const MAX_EXPIRES_IN_SECS: i64 = 24 * 60 * 60;

/// Application credentials registered with the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Exchanges refresh tokens for new access tokens.
///
/// One instance is shared by the legacy token store and the account registry.
/// [`TokenRefresher::refresh`] never fails loudly: rejected grants, malformed
/// responses, network errors and timeouts all come back as `None`.
///
/// # Example
/// ```no_run
/// use outlook_auth::auth::{ClientCredentials, TokenRefresher};
///
/// # async fn run() -> Result<(), outlook_auth::auth::AuthError> {
/// let refresher = TokenRefresher::new(
///     ClientCredentials::new("client-id", "client-secret"),
///     vec!["offline_access".to_string(), "Mail.Read".to_string()],
/// )?;
/// if let Some(token) = refresher.refresh("refresh-token").await {
///     println!("expires at {}", token.expires_at);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TokenRefresher {
    client: reqwest::Client,
    token_url: String,
    credentials: ClientCredentials,
    scopes: Vec<String>,
}

impl TokenRefresher {
    pub fn new(credentials: ClientCredentials, scopes: Vec<String>) -> Result<Self, AuthError> {
        Self::with_timeout(credentials, scopes, DEFAULT_REFRESH_TIMEOUT)
    }

    pub fn with_timeout(
        credentials: ClientCredentials,
        scopes: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT))
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            credentials,
            scopes,
        })
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Refresh, logging and swallowing every failure.
    pub async fn refresh(&self, refresh_token: &str) -> Option<TokenRecord> {
        match self.exchange(refresh_token).await {
            Ok(token) => {
                info!(expires_at = token.expires_at, "access token refreshed");
                Some(token)
            }
            Err(error) => {
                warn!(%error, "token refresh failed");
                None
            }
        }
    }

    /// Perform the exchange and report why it failed.
    pub async fn exchange(&self, refresh_token: &str) -> Result<TokenRecord, AuthError> {
        let scope = self.scopes.join(" ");
        debug!(token_url = %self.token_url, "exchanging refresh token");

        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", scope.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        let payload: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let access_token = payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::InvalidResponse("token response missing access_token".to_string())
            })?;
        let expires_in = payload
            .expires_in
            .as_ref()
            .and_then(parse_expires_in)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        Ok(TokenRecord {
            access_token,
            refresh_token: payload
                .refresh_token
                .filter(|token| !token.is_empty())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expires_at_from_now(expires_in, Utc::now()),
            scope: payload.scope,
            token_type: payload.token_type,
            extra: payload.extra,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<serde_json::Value>,
    scope: Option<String>,
    token_type: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

fn parse_expires_in(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
        .map(|secs: i64| secs.clamp(0, MAX_EXPIRES_IN_SECS))
}

fn provider_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderError {
        error: Option<String>,
        error_description: Option<String>,
    }

    match serde_json::from_str::<ProviderError>(body) {
        Ok(ProviderError {
            error: Some(code),
            error_description,
        }) => match error_description {
            Some(description) => format!("{code}: {}", first_line(&description)),
            None => code,
        },
        _ if body.is_empty() => "empty response body".to_string(),
        _ => first_line(body).to_string(),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
