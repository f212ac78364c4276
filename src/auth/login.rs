// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Login and session establishment
//!
//! Implements the relying-party side of the OAuth2 authorization-code flow
//! with PKCE. One authentication attempt moves through three states:
//!
//! - **Unauthenticated** → `GET /auth/login` stashes the PKCE verifier and a
//!   state nonce in private, path-scoped cookies and redirects the browser
//!   to the provider's authorization endpoint → **Pending**
//! - **Pending** → the provider redirects back to `GET /auth/callback` with
//!   an authorization code, which is exchanged server-to-server at the token
//!   endpoint → **Authenticated** (session record populated) or **Error**
//!
//! After a successful login the browser always lands on `/profile`,
//! regardless of where the login was initiated from. Failures map to fixed
//! user-facing error codes on `/auth/error`; raw provider error text never
//! reaches the user.

use log::{debug, error};
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::Redirect;
use rocket::time::Duration;
use rocket::{get, State};
use uuid::Uuid;

use super::pkce::generate_pkce_challenge;
use super::provider::OidcProvider;
use super::session::{establish, session_cookie};
use crate::config::Config;

/// Private cookie holding the login state nonce between redirect legs.
pub const LOGIN_STATE_COOKIE: &str = "storefront_auth.login_state";

/// Private cookie holding the PKCE verifier between redirect legs.
pub const PKCE_VERIFIER_COOKIE: &str = "storefront_auth.pkce_verifier";

/// How long the login-flow cookies stay valid.
const LOGIN_FLOW_MAX_AGE: Duration = Duration::minutes(10);

/// Fixed landing route after a successful login.
pub const POST_LOGIN_ROUTE: &str = "/profile";

/// User-facing authentication error codes.
///
/// Provider failures are folded into these three categories; the raw
/// provider error text is logged but never displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The relying party or provider is misconfigured, or the token
    /// exchange failed.
    Configuration,
    /// The user or the provider denied the authorization request, or the
    /// callback failed CSRF validation.
    AccessDenied,
    /// The provider reported an account-linking conflict.
    AccountNotLinked,
}

impl AuthError {
    /// Stable code used in the `/auth/error` query string.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Configuration => "Configuration",
            AuthError::AccessDenied => "AccessDenied",
            AuthError::AccountNotLinked => "OAuthAccountNotLinked",
        }
    }

    /// Message displayed on the error page.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::Configuration => {
                "There is a problem with the server configuration. Please try again later."
            }
            AuthError::AccessDenied => "Access was denied. You may not have permission to sign in.",
            AuthError::AccountNotLinked => {
                "This account is already linked to another sign-in method."
            }
        }
    }

    /// Map a provider `error` query parameter to a user-facing code.
    fn from_provider_error(code: &str) -> Self {
        match code {
            "access_denied" | "consent_required" | "interaction_required" => {
                AuthError::AccessDenied
            }
            "account_linking_required" | "account_selection_required" => {
                AuthError::AccountNotLinked
            }
            _ => AuthError::Configuration,
        }
    }

    /// Look an error up from its stable code (used by the error page).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Configuration" => Some(AuthError::Configuration),
            "AccessDenied" => Some(AuthError::AccessDenied),
            "OAuthAccountNotLinked" => Some(AuthError::AccountNotLinked),
            _ => None,
        }
    }
}

/// Build one of the short-lived private cookies carrying login-flow state.
fn flow_cookie(name: &'static str, value: String, config: &Config) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/auth/callback")
        .secure(config.server.secure_cookies)
        .max_age(LOGIN_FLOW_MAX_AGE)
        .build()
}

/// Read and delete one of the login-flow cookies.
fn take_flow_cookie(cookies: &CookieJar<'_>, name: &'static str) -> Option<String> {
    let value = cookies
        .get_private(name)
        .map(|cookie| cookie.value().to_string());
    cookies.remove_private(Cookie::build(name).path("/auth/callback"));
    value
}

/// Redirect to the error page with a fixed error code.
fn error_redirect(error: AuthError) -> Redirect {
    Redirect::to(format!("/auth/error?error={}", error.code()))
}

/// Initiate the sign-in flow.
///
/// Generates the PKCE challenge and state nonce, stores their secret halves
/// in private cookies scoped to the callback path, and redirects the
/// browser to the provider's authorization endpoint.
#[get("/auth/login")]
pub fn login(
    config: &State<Config>,
    provider: &State<OidcProvider>,
    cookies: &CookieJar<'_>,
) -> Redirect {
    let pkce = generate_pkce_challenge();
    let state = Uuid::new_v4().to_string();
    let redirect_uri = format!("{}/auth/callback", config.external_base_url());
    let url = provider.authorize_url(&redirect_uri, &state, &pkce.challenge);

    cookies.add_private(flow_cookie(LOGIN_STATE_COOKIE, state, config));
    cookies.add_private(flow_cookie(PKCE_VERIFIER_COOKIE, pkce.verifier, config));

    debug!("Redirecting to the authorization endpoint");
    Redirect::to(url.to_string())
}

/// Authorization-code callback.
///
/// Validates the state nonce against the private cookie, exchanges the code
/// at the provider's token endpoint (server-to-server) and populates the
/// session record. On success the browser is sent to the fixed landing
/// route; on failure to `/auth/error` with a fixed error code.
#[get("/auth/callback?<code>&<state>&<error>")]
pub async fn login_callback(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    config: &State<Config>,
    provider: &State<OidcProvider>,
    cookies: &CookieJar<'_>,
) -> Redirect {
    let stored_state = take_flow_cookie(cookies, LOGIN_STATE_COOKIE);
    let verifier = take_flow_cookie(cookies, PKCE_VERIFIER_COOKIE);

    if let Some(provider_error) = error {
        error!("Provider returned an authorization error: {}", provider_error);
        return error_redirect(AuthError::from_provider_error(&provider_error));
    }

    match (&state, &stored_state) {
        (Some(received), Some(stored)) if received == stored => {}
        _ => {
            error!("Login callback state mismatch or missing state cookie");
            return error_redirect(AuthError::AccessDenied);
        }
    }

    let (Some(code), Some(verifier)) = (code, verifier) else {
        error!("Login callback missing authorization code or PKCE verifier");
        return error_redirect(AuthError::Configuration);
    };

    let redirect_uri = format!("{}/auth/callback", config.external_base_url());
    match provider.exchange_code(&code, &redirect_uri, &verifier).await {
        Ok(tokens) => {
            let record = establish(tokens);
            match session_cookie(&record, config) {
                Ok(cookie) => {
                    cookies.add_private(cookie);
                    debug!("Session established, redirecting to {}", POST_LOGIN_ROUTE);
                    Redirect::to(POST_LOGIN_ROUTE)
                }
                Err(err) => {
                    error!("Failed to encode session cookie: {}", err);
                    error_redirect(AuthError::Configuration)
                }
            }
        }
        Err(err) => {
            error!("Authorization-code exchange failed: {}", err);
            error_redirect(AuthError::Configuration)
        }
    }
}
