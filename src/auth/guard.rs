// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guard exposing the authenticated session
//!
//! The guard is the composition point of the session pipeline: it decodes
//! the private session cookie into a [`SessionRecord`], runs the refresh
//! step when the access token has expired, and rewrites the cookie when the
//! record changed. Handlers receive the (possibly degraded) record and are
//! responsible for treating an error-bearing session as needing re-login;
//! the logout route in particular must keep working for degraded sessions,
//! which still carry the identity token.

use log::{debug, error};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

use super::provider::OidcProvider;
use super::refresh::ensure_fresh;
use super::session::{decode_session, session_cookie, SessionRecord, SESSION_COOKIE};
use crate::config::Config;

/// An authenticated (possibly degraded) session for the current request.
pub struct AuthSession {
    pub record: SessionRecord,
}

impl AuthSession {
    /// Whether the session's access token is usable.
    ///
    /// A set error flag makes the access token unusable regardless of its
    /// recorded expiry.
    pub fn is_usable(&self) -> bool {
        self.record.error.is_none() && self.record.access_token.is_some()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthSession {
    type Error = ();

    /// Extracts an `AuthSession` from the request if a valid session cookie
    /// is present, refreshing the access token on the way when it expired.
    ///
    /// Returns `Outcome::Forward` when the cookie is missing or unreadable,
    /// so routes taking `Option<AuthSession>` observe `None`.
    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookies = request.cookies();
        let Some(cookie) = cookies.get_private(SESSION_COOKIE) else {
            debug!("No session cookie found");
            return Outcome::Forward(Status::Unauthorized);
        };

        let (Some(config), Some(provider)) = (
            request.rocket().state::<Config>(),
            request.rocket().state::<OidcProvider>(),
        ) else {
            error!("Session guard used without managed Config/OidcProvider state");
            return Outcome::Forward(Status::InternalServerError);
        };

        let Some(record) = decode_session(cookie.value(), &config.server.session_secret) else {
            debug!("Session cookie did not decode to a valid record");
            return Outcome::Forward(Status::Unauthorized);
        };

        let refreshed = ensure_fresh(record.clone(), provider).await;
        if refreshed != record {
            // Persist the rewritten record (new tokens or error sentinel).
            match session_cookie(&refreshed, config) {
                Ok(cookie) => cookies.add_private(cookie),
                Err(err) => error!("Failed to re-encode session cookie: {}", err),
            }
        }

        Outcome::Success(AuthSession { record: refreshed })
    }
}
