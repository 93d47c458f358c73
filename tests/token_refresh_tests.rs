mod auth_support;

use std::time::Duration;

use chrono::Utc;
use outlook_auth::auth::{AuthError, ClientCredentials, TokenRefresher};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_support::{mount_invalid_grant, refresher, TOKEN_PATH};

#[tokio::test]
async fn refresh_posts_form_encoded_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=client-123"))
        .and(body_string_contains("client_secret=secret-456"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .and(body_string_contains("scope=offline_access+Mail.Read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 3599,
            "scope": "Mail.Read",
            "token_type": "Bearer",
            "ext_expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let before = Utc::now().timestamp_millis();
    let token = refresher(&server)
        .refresh("refresh-abc")
        .await
        .expect("refresh succeeds");
    let after = Utc::now().timestamp_millis();

    assert_eq!(token.access_token, "new-access");
    assert_eq!(token.refresh_token.as_deref(), Some("new-refresh"));
    assert_eq!(token.scope.as_deref(), Some("Mail.Read"));
    assert!(token.expires_at >= before + 3_599_000 && token.expires_at <= after + 3_599_000);
    assert_eq!(token.extra.get("ext_expires_in"), Some(&json!(3599)));
}

#[tokio::test]
async fn missing_expires_in_defaults_to_one_hour() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access"
        })))
        .mount(&server)
        .await;

    let token = refresher(&server).refresh("refresh-abc").await.unwrap();
    let remaining = token.expires_at - Utc::now().timestamp_millis();
    assert!(remaining > 3_590_000 && remaining <= 3_600_000);
}

#[tokio::test]
async fn unrotated_refresh_token_is_carried_forward() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": "3600"
        })))
        .mount(&server)
        .await;

    let token = refresher(&server).refresh("keep-me").await.unwrap();
    assert_eq!(token.refresh_token.as_deref(), Some("keep-me"));
}

#[tokio::test]
async fn absurd_expires_in_is_clamped_instead_of_overflowing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "x",
            "expires_in": i64::MAX
        })))
        .mount(&server)
        .await;

    let token = refresher(&server).refresh("rt").await.expect("refresh succeeds");
    let remaining = token.expires_at - Utc::now().timestamp_millis();
    assert!(remaining > 0 && remaining <= 24 * 60 * 60 * 1000);
    assert!(!token.is_expired());
}

#[tokio::test]
async fn negative_expires_in_yields_an_already_expired_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "x",
            "expires_in": -3600
        })))
        .mount(&server)
        .await;

    let token = refresher(&server).refresh("rt").await.expect("refresh succeeds");
    assert!(token.expires_at <= Utc::now().timestamp_millis());
}

#[tokio::test]
async fn invalid_grant_resolves_to_none() {
    let server = MockServer::start().await;
    mount_invalid_grant(&server).await;

    let refresher = refresher(&server);
    assert!(refresher.refresh("revoked").await.is_none());

    match refresher.exchange("revoked").await {
        Err(AuthError::RefreshRejected { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.starts_with("invalid_grant"));
        }
        other => panic!("expected RefreshRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn success_status_without_access_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let result = refresher(&server).exchange("refresh-abc").await;
    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
}

#[tokio::test]
async fn non_json_success_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert!(refresher(&server).refresh("refresh-abc").await.is_none());
}

#[tokio::test]
async fn slow_provider_times_out_as_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let refresher = TokenRefresher::with_timeout(
        ClientCredentials::new("client-123", "secret-456"),
        vec![],
        Duration::from_millis(200),
    )
    .unwrap()
    .with_token_url(format!("{}{TOKEN_PATH}", server.uri()));

    assert!(matches!(
        refresher.exchange("refresh-abc").await,
        Err(AuthError::Timeout)
    ));
    assert!(refresher.refresh("refresh-abc").await.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_resolves_to_none() {
    let refresher = TokenRefresher::new(ClientCredentials::new("id", "secret"), vec![])
        .unwrap()
        .with_token_url("http://127.0.0.1:9/token");
    assert!(refresher.refresh("refresh-abc").await.is_none());
}
