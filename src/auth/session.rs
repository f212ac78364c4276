// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session record storage and projection
//!
//! The session record holds the token set obtained from the identity
//! provider: the identity token (needed to initiate logout), the access
//! token with its absolute expiry, and the refresh token consumed by the
//! refresh protocol. The record travels between requests inside a signed
//! session JWT which is itself stored in a Rocket *private* (encrypted)
//! cookie, so the refresh token never reaches the client in readable form.
//!
//! The lifecycle is a pure function pipeline composed by the request layer:
//!
//! - [`establish`] builds a record from the authorization-code exchange
//! - [`crate::auth::refresh::ensure_fresh`] rewrites an expired record
//! - [`project`] shapes the client-visible view (no refresh token)

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::Duration;
use serde::{Deserialize, Serialize};

use super::provider::TokenSet;
use crate::config::Config;

/// Name of the private cookie carrying the session JWT.
pub const SESSION_COOKIE: &str = "storefront-session.token";

/// Infix matched when clearing session-framework cookies on logout.
pub const SESSION_COOKIE_INFIX: &str = "storefront_auth.";

/// Name prefixes matched when clearing session-framework cookies on logout,
/// covering the plain, prefixed-secure and prefixed-host forms.
pub const SESSION_COOKIE_PREFIXES: [&str; 3] = [
    "storefront-session.",
    "__Secure-storefront-session.",
    "__Host-storefront-session.",
];

/// Error sentinel recorded in the session when token refresh fails.
///
/// Its presence means the access token must be treated as unusable
/// regardless of `expires_at`; the user needs to re-authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    RefreshAccessTokenError,
}

/// Durable token state for one authenticated user.
///
/// Created by [`establish`] on a successful authorization-code exchange,
/// mutated in place by the refresh protocol, and destroyed by the logout
/// protocol's local-teardown step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Identity assertion from the provider; required to initiate logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Bearer credential for the provider's userinfo endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Credential used solely by the refresh protocol. Never projected to
    /// the client-visible session view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute epoch-millisecond expiry of `access_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Set when refresh fails; absence means healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

/// Client-visible projection of a session record.
///
/// Only data the frontend needs: the identity token for logout, the access
/// token for provider API calls, and the refresh-failure flag. The refresh
/// token and expiry bookkeeping stay server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

/// Session JWT body: the record plus standard expiry claims.
#[derive(Serialize, Deserialize)]
struct SessionClaims {
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    record: SessionRecord,
}

/// Build a session record from a freshly exchanged token set.
///
/// All four token fields are populated and the error flag cleared. When the
/// provider omits `expires_in`, the access token is assumed to live for
/// [`super::provider::DEFAULT_TOKEN_LIFETIME_SECS`].
pub fn establish(tokens: TokenSet) -> SessionRecord {
    let now = Utc::now().timestamp_millis();
    let lifetime = tokens
        .expires_in
        .unwrap_or(super::provider::DEFAULT_TOKEN_LIFETIME_SECS);
    SessionRecord {
        id_token: tokens.id_token,
        access_token: Some(tokens.access_token),
        refresh_token: tokens.refresh_token,
        expires_at: Some(now + lifetime * 1000),
        error: None,
    }
}

/// Shape the client-visible session view.
pub fn project(record: &SessionRecord) -> PublicSession {
    PublicSession {
        id_token: record.id_token.clone(),
        access_token: record.access_token.clone(),
        error: record.error,
    }
}

/// Encode a session record as a signed HS256 JWT.
pub fn encode_session(record: &SessionRecord, secret: &str, duration_secs: i64) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        iat: now,
        exp: now + duration_secs,
        record: record.clone(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode session JWT")
}

/// Decode and verify a session JWT back into a record.
///
/// Returns `None` when the token is malformed, expired, or carries an
/// invalid signature — all three read as "no session".
pub fn decode_session(token: &str, secret: &str) -> Option<SessionRecord> {
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims.record)
}

/// Build the private session cookie for a record.
pub fn session_cookie(record: &SessionRecord, config: &Config) -> Result<Cookie<'static>> {
    let jwt = encode_session(
        record,
        &config.server.session_secret,
        config.oidc.session_duration as i64,
    )?;
    Ok(Cookie::build((SESSION_COOKIE, jwt))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.server.secure_cookies)
        .max_age(Duration::seconds(config.oidc.session_duration as i64))
        .build())
}

/// Check whether a cookie name belongs to the session framework.
///
/// Matches the four documented variants: names containing
/// [`SESSION_COOKIE_INFIX`] or starting with one of
/// [`SESSION_COOKIE_PREFIXES`].
pub fn is_session_cookie_name(name: &str) -> bool {
    name.contains(SESSION_COOKIE_INFIX)
        || SESSION_COOKIE_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Schedule deletion of every session-framework cookie in the jar.
pub fn remove_session_cookies(cookies: &CookieJar<'_>) {
    let names: Vec<String> = cookies
        .iter()
        .map(|cookie| cookie.name().to_string())
        .filter(|name| is_session_cookie_name(name))
        .collect();
    for name in names {
        cookies.remove(Cookie::build(name).path("/"));
    }
}
