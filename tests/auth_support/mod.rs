#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use outlook_auth::auth::{ClientCredentials, TokenRecord, TokenRefresher};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/common/oauth2/v2.0/token";

pub fn refresher(server: &MockServer) -> Arc<TokenRefresher> {
    Arc::new(
        TokenRefresher::new(
            ClientCredentials::new("client-123", "secret-456"),
            vec!["offline_access".to_string(), "Mail.Read".to_string()],
        )
        .expect("build refresher")
        .with_token_url(format!("{}{TOKEN_PATH}", server.uri())),
    )
}

/// Token valid for `secs` more seconds.
pub fn live(access: &str, refresh: Option<&str>, secs: i64) -> TokenRecord {
    TokenRecord::issued(access, refresh.map(String::from), secs)
}

/// Token that expired a minute ago.
pub fn expired(access: &str, refresh: Option<&str>) -> TokenRecord {
    TokenRecord {
        access_token: access.to_string(),
        refresh_token: refresh.map(String::from),
        expires_at: Utc::now().timestamp_millis() - 60_000,
        ..Default::default()
    }
}

pub async fn mount_refresh_success(server: &MockServer, access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "scope": "offline_access Mail.Read",
            "expires_in": 3600,
            "access_token": access,
            "refresh_token": "rotated-refresh"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_invalid_grant(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70008: The refresh token has expired."
        })))
        .mount(server)
        .await;
}
