use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront::auth::provider::OidcProvider;
use storefront::auth::refresh::ensure_fresh;
use storefront::auth::session::{SessionError, SessionRecord};
use storefront::config::OidcConfig;

fn provider_config(mock_uri: &str) -> OidcConfig {
    OidcConfig {
        issuer: "http://id.example.com".to_string(),
        internal_issuer: Some(mock_uri.to_string()),
        client_id: "storefront-client".to_string(),
        client_secret: "storefront-secret".to_string(),
        ..OidcConfig::default()
    }
}

fn expired_record() -> SessionRecord {
    SessionRecord {
        id_token: Some("id.token.value".to_string()),
        access_token: Some("stale-access-token".to_string()),
        refresh_token: Some("refresh-token-1".to_string()),
        expires_at: Some(Utc::now().timestamp_millis() - 1_000),
        error: None,
    }
}

#[tokio::test]
async fn fresh_token_skips_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let mut record = expired_record();
    record.expires_at = Some(Utc::now().timestamp_millis() + 60_000);

    let result = ensure_fresh(record.clone(), &provider).await;
    assert_eq!(result, record);
}

#[tokio::test]
async fn expired_token_is_refreshed_with_one_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        // The provider instance is selected by the advertised public host,
        // not the internal connection address.
        .and(header("host", "id.example.com"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "expires_in": 1800,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let before = Utc::now().timestamp_millis();
    let result = ensure_fresh(expired_record(), &provider).await;

    assert_eq!(result.access_token.as_deref(), Some("new-access-token"));
    assert_eq!(result.id_token.as_deref(), Some("id.token.value"));
    assert!(result.error.is_none());
    let expires_at = result.expires_at.expect("expiry recorded");
    assert!(expires_at >= before + 1_800_000);
    // No rotation in the response, the old refresh token stays.
    assert_eq!(result.refresh_token.as_deref(), Some("refresh-token-1"));
}

#[tokio::test]
async fn rotated_refresh_token_replaces_the_old_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "refresh_token": "refresh-token-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let result = ensure_fresh(expired_record(), &provider).await;

    assert_eq!(result.refresh_token.as_deref(), Some("refresh-token-2"));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn missing_expires_in_assumes_the_default_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "new-access-token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let before = Utc::now().timestamp_millis();
    let result = ensure_fresh(expired_record(), &provider).await;

    let expires_at = result.expires_at.expect("expiry recorded");
    assert!(expires_at >= before + 3_600_000);
}

#[tokio::test]
async fn missing_refresh_token_degrades_without_a_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let mut record = expired_record();
    record.refresh_token = None;

    let result = ensure_fresh(record, &provider).await;
    assert_eq!(result.error, Some(SessionError::RefreshAccessTokenError));
    assert_eq!(result.access_token.as_deref(), Some("stale-access-token"));
    assert_eq!(result.id_token.as_deref(), Some("id.token.value"));
}

#[tokio::test]
async fn provider_rejection_sets_the_sentinel_and_keeps_the_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let result = ensure_fresh(expired_record(), &provider).await;

    assert_eq!(result.error, Some(SessionError::RefreshAccessTokenError));
    assert_eq!(result.access_token.as_deref(), Some("stale-access-token"));
    assert_eq!(result.refresh_token.as_deref(), Some("refresh-token-1"));
    assert_eq!(result.id_token.as_deref(), Some("id.token.value"));
}

#[tokio::test]
async fn success_without_access_token_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let result = ensure_fresh(expired_record(), &provider).await;

    assert_eq!(result.error, Some(SessionError::RefreshAccessTokenError));
    assert_eq!(result.access_token.as_deref(), Some("stale-access-token"));
}

#[tokio::test]
async fn record_without_expiry_is_treated_as_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OidcProvider::new(&provider_config(&server.uri())).expect("provider builds");
    let mut record = expired_record();
    record.expires_at = None;

    let result = ensure_fresh(record, &provider).await;
    assert_eq!(result.access_token.as_deref(), Some("new-access-token"));
}
