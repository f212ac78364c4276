// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Two-leg CSRF-protected logout
//!
//! Sign-out is split in two legs around a round trip to the provider:
//!
//! - **Leg A** (`POST /logout`): mints a one-time state nonce, stores it in
//!   a cookie scoped to the callback path, clears the local session cookies
//!   eagerly and redirects the browser to the provider's end-session
//!   endpoint. Requiring POST keeps a hostile page from triggering logout
//!   with a plain link or image tag.
//! - **Leg B** (`GET /logout/callback?state=...`): the provider redirects
//!   back after terminating its own session. The state parameter must match
//!   the cookie exactly; only then are the remaining cookies cleared and a
//!   `Clear-Site-Data` header issued. A mismatch clears nothing and lands on
//!   the error page with a fixed reason.
//!
//! Local cookies are cleared in leg A already so that the user is logged out
//! locally even when the provider round trip never completes.

use log::{debug, error};
use rocket::http::{Cookie, CookieJar, Header, SameSite, Status};
use rocket::response::status::BadRequest;
use rocket::response::{Responder, Response};
use rocket::serde::json::Json;
use rocket::time::Duration;
use rocket::{get, post, Request, State};
use serde_json::{json, Value};
use uuid::Uuid;

use super::guard::AuthSession;
use super::provider::OidcProvider;
use super::session::remove_session_cookies;
use crate::config::Config;

/// Cookie carrying the logout state nonce between the two legs.
pub const LOGOUT_STATE_COOKIE: &str = "logout_state";

/// Path the logout-state cookie is scoped to.
const LOGOUT_CALLBACK_PATH: &str = "/logout/callback";

/// How long the logout-state cookie stays valid.
const LOGOUT_STATE_MAX_AGE: Duration = Duration::minutes(10);

/// Fixed reason shown when leg B fails CSRF validation.
pub const INVALID_STATE_REASON: &str = "Invalid or missing state parameter.";

/// A `303 See Other` redirect, optionally carrying `Clear-Site-Data`.
///
/// Rocket's built-in `Redirect` responder does not allow extra headers, and
/// the logout callback must pair its redirect with a cookie-clearing header.
pub struct SeeOther {
    location: String,
    clear_site_data: bool,
}

impl SeeOther {
    pub fn to(location: String) -> Self {
        SeeOther {
            location,
            clear_site_data: false,
        }
    }

    /// Redirect and instruct the browser to drop all cookies for the site.
    pub fn clearing_cookies(location: String) -> Self {
        SeeOther {
            location,
            clear_site_data: true,
        }
    }
}

impl<'r> Responder<'r, 'static> for SeeOther {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let mut builder = Response::build();
        builder
            .status(Status::SeeOther)
            .header(Header::new("Location", self.location));
        if self.clear_site_data {
            builder.header(Header::new("Clear-Site-Data", "\"cookies\""));
        }
        builder.ok()
    }
}

/// Build a browser-facing redirect target for a local route.
///
/// Prefers the configured canonical base URL; otherwise returns a relative
/// path, which the browser resolves against the origin it is already
/// talking to. The Host header is never consulted.
fn redirect_target(config: &Config, path: &str, params: &[(&str, &str)]) -> String {
    let query = if params.is_empty() {
        String::new()
    } else {
        format!(
            "?{}",
            serde_urlencoded::to_string(params).unwrap_or_default()
        )
    };

    match config
        .oidc
        .public_base_url
        .as_deref()
        .and_then(|raw| url::Url::parse(raw).ok())
    {
        Some(base) => format!("{}{}{}", base.as_str().trim_end_matches('/'), path, query),
        None => format!("{}{}", path, query),
    }
}

/// Initiate sign-out (leg A).
///
/// Sessions degraded by a refresh failure still carry the identity token
/// and can sign out normally. Without a session or without an identity
/// token there is nothing to terminate at the provider, so the request is
/// rejected with a JSON error and no cookie is touched.
#[post("/logout")]
pub fn logout(
    session: Option<AuthSession>,
    config: &State<Config>,
    provider: &State<OidcProvider>,
    cookies: &CookieJar<'_>,
) -> Result<SeeOther, BadRequest<Json<Value>>> {
    let Some(id_token) = session.and_then(|session| session.record.id_token) else {
        error!("Logout requested without a session or identity token");
        return Err(BadRequest(Json(json!({
            "error": "No valid session or ID token found"
        }))));
    };

    let state = Uuid::new_v4().to_string();
    let url = provider.end_session_url(&id_token, &config.post_logout_redirect_uri(), &state);

    cookies.add(
        Cookie::build((LOGOUT_STATE_COOKIE, state))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path(LOGOUT_CALLBACK_PATH)
            .secure(config.server.secure_cookies)
            .max_age(LOGOUT_STATE_MAX_AGE)
            .build(),
    );

    // Clear the local session now so the user is logged out locally even if
    // the provider round trip never completes.
    remove_session_cookies(cookies);

    debug!("Redirecting to the provider end-session endpoint");
    Ok(SeeOther::to(url.to_string()))
}

/// Complete sign-out (leg B).
///
/// The state parameter must match the cookie from leg A exactly. On a
/// mismatch nothing is cleared: the request did not provably originate from
/// our own leg A, and destroying state on behalf of a forged request is
/// exactly what the nonce is there to prevent.
#[get("/logout/callback?<state>")]
pub fn logout_callback(
    state: Option<String>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
) -> SeeOther {
    let stored = cookies
        .get(LOGOUT_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());

    match (&state, &stored) {
        (Some(received), Some(expected)) if received == expected => {
            remove_session_cookies(cookies);
            cookies.remove(Cookie::build(LOGOUT_STATE_COOKIE).path(LOGOUT_CALLBACK_PATH));
            debug!("Logout state validated, completing sign-out");
            SeeOther::clearing_cookies(redirect_target(config, "/logout/success", &[]))
        }
        _ => {
            error!("Logout callback state mismatch or missing state cookie");
            SeeOther::to(redirect_target(
                config,
                "/logout/error",
                &[("reason", INVALID_STATE_REASON)],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::default()
    }

    #[test]
    fn redirect_target_prefers_canonical_base_url() {
        let mut config = base_config();
        config.oidc.public_base_url = Some("https://shop.example.com/".to_string());
        assert_eq!(
            redirect_target(&config, "/logout/success", &[]),
            "https://shop.example.com/logout/success"
        );
    }

    #[test]
    fn redirect_target_falls_back_to_relative_path() {
        let config = base_config();
        assert_eq!(
            redirect_target(&config, "/logout/success", &[]),
            "/logout/success"
        );
    }

    #[test]
    fn redirect_target_encodes_query_parameters() {
        let config = base_config();
        let target = redirect_target(&config, "/logout/error", &[("reason", INVALID_STATE_REASON)]);
        assert_eq!(
            target,
            "/logout/error?reason=Invalid+or+missing+state+parameter."
        );
    }

    #[test]
    fn invalid_base_url_is_ignored() {
        let mut config = base_config();
        config.oidc.public_base_url = Some("not a url".to_string());
        assert_eq!(
            redirect_target(&config, "/logout/success", &[]),
            "/logout/success"
        );
    }
}
