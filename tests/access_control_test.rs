use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use storefront::auth::session::{encode_session, SessionError, SessionRecord, SESSION_COOKIE};
use storefront::config::Config;
use storefront::web::build_rocket;

const SESSION_SECRET: &str = "/qCJ7RyQIugza05wgFNN6R+c2/afrKlG5jJfZ0oQPis=";

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.session_secret = SESSION_SECRET.to_string();
    config.oidc.issuer = "http://id.example.com".to_string();
    config.oidc.client_id = "storefront-client".to_string();
    config.oidc.client_secret = "storefront-secret".to_string();
    config
}

async fn test_client() -> Client {
    let figment = rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", 0))
        .merge(("secret_key", SESSION_SECRET.to_string()))
        .merge(("log_level", rocket::config::LogLevel::Off));
    let rocket = build_rocket(figment, test_config()).expect("valid configuration");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

/// Build an unsigned JWT-shaped token with the given payload. Role
/// extraction only reads the payload; signatures are the provider's
/// concern.
fn fake_jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

fn record_with_access_token(access_token: String) -> SessionRecord {
    SessionRecord {
        id_token: Some("id.token.value".to_string()),
        access_token: Some(access_token),
        refresh_token: Some("refresh-token-value".to_string()),
        expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
        error: None,
    }
}

fn session_cookie(record: &SessionRecord) -> Cookie<'static> {
    let jwt = encode_session(record, SESSION_SECRET, 3600).expect("session encodes");
    Cookie::new(SESSION_COOKIE, jwt)
}

#[rocket::async_test]
async fn anonymous_visitor_sees_the_sign_in_prompt() {
    let client = test_client().await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.expect("page body");
    assert!(body.contains("Sign in"));
}

#[rocket::async_test]
async fn profile_requires_a_session() {
    let client = test_client().await;

    let response = client.get("/profile").dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/auth/login"));
}

#[rocket::async_test]
async fn degraded_session_is_sent_back_through_login() {
    let client = test_client().await;
    let mut record = record_with_access_token("access-token-value".to_string());
    record.error = Some(SessionError::RefreshAccessTokenError);

    let response = client
        .get("/profile")
        .private_cookie(session_cookie(&record))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/auth/login"));
}

#[rocket::async_test]
async fn profile_lists_the_user_roles() {
    let client = test_client().await;
    let token = fake_jwt(&json!({
        "sub": "user-1",
        "urn:zitadel:iam:org:project:roles": {
            "customer": {"123": "org.example.com"},
            "vip": {"123": "org.example.com"}
        }
    }));

    let response = client
        .get("/profile")
        .private_cookie(session_cookie(&record_with_access_token(token)))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.expect("page body");
    assert!(body.contains("customer"));
    assert!(body.contains("vip"));
}

#[rocket::async_test]
async fn api_session_without_a_session_is_unauthorized() {
    let client = test_client().await;

    let response = client.get("/api/session").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn api_session_projects_the_record() {
    let client = test_client().await;
    let record = record_with_access_token("access-token-value".to_string());

    let response = client
        .get("/api/session")
        .private_cookie(session_cookie(&record))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value =
        serde_json::from_str(&response.into_string().await.expect("session body"))
            .expect("valid JSON session");
    assert_eq!(body["accessToken"], "access-token-value");
    assert_eq!(body["idToken"], "id.token.value");
    assert!(body.get("refreshToken").is_none());
    assert!(body.get("expiresAt").is_none());
}

#[rocket::async_test]
async fn monitoring_requires_a_session() {
    let client = test_client().await;

    let response = client.get("/admin/monitoring").dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/auth/login"));
}

#[rocket::async_test]
async fn monitoring_denies_non_admins() {
    let client = test_client().await;
    let token = fake_jwt(&json!({
        "sub": "user-1",
        "urn:zitadel:iam:org:project:roles": {
            "customer": {"123": "org.example.com"}
        }
    }));

    let response = client
        .get("/admin/monitoring")
        .private_cookie(session_cookie(&record_with_access_token(token)))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Forbidden);
    let body = response.into_string().await.expect("page body");
    assert!(body.contains("restricted to administrators"));
}

#[rocket::async_test]
async fn admins_see_the_embedded_dashboard() {
    let client = test_client().await;
    let token = fake_jwt(&json!({
        "sub": "user-1",
        "urn:zitadel:iam:org:project:roles": {
            "admin": {"123": "org.example.com"}
        }
    }));

    let response = client
        .get("/admin/monitoring")
        .private_cookie(session_cookie(&record_with_access_token(token)))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.expect("page body");
    assert!(body.contains("<iframe"));
    assert!(body.contains("http://localhost:3002/d/api-logs/api-logs-dashboard"));
}

#[rocket::async_test]
async fn admin_role_can_come_from_the_id_token() {
    let client = test_client().await;
    let id_token = fake_jwt(&json!({
        "sub": "user-1",
        "urn:zitadel:iam:org:projects:roles": {
            "admin": {"123": "org.example.com"}
        }
    }));
    let mut record = record_with_access_token("opaque-access-token".to_string());
    record.id_token = Some(id_token);

    let response = client
        .get("/admin/monitoring")
        .private_cookie(session_cookie(&record))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
}
