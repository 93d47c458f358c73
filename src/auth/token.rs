use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the identity provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Bearer token record as persisted on disk and held in memory.
///
/// `expires_at` is absolute epoch milliseconds, always computed locally as
/// `now + expires_in * 1000` when the token is issued or refreshed. Fields
/// the provider returns beyond the ones modelled here are kept in `extra` so
/// the stored document is the full merged response.
///
/// # Example
/// ```
/// use outlook_auth::auth::TokenRecord;
///
/// let record = TokenRecord::issued("access", Some("refresh".to_string()), 3600);
/// assert!(!record.is_expired());
/// assert!(record.can_refresh());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenRecord {
    /// Build a record that expires `expires_in_secs` from now.
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_at_from_now(expires_in_secs, Utc::now()),
            ..Default::default()
        }
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp_millis()
    }

    /// True when the token expires within `window` of now (or already has).
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at <= (Utc::now() + window).timestamp_millis()
    }

    /// Present, non-empty and not yet expired.
    pub fn is_live(&self) -> bool {
        self.has_access_token() && !self.is_expired()
    }

    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expires_at).single()
    }
}

pub(crate) fn expires_at_from_now(expires_in_secs: i64, now: DateTime<Utc>) -> i64 {
    now.timestamp_millis()
        .saturating_add(expires_in_secs.saturating_mul(1000))
}
