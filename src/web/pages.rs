// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTML pages and the thin session API
//!
//! The storefront pages are deliberately minimal consumers of the session
//! pipeline: they read the [`AuthSession`] guard, branch on
//! [`AuthSession::is_usable`] and render a handlebars template. A session
//! degraded by a refresh failure is treated exactly like no session at all
//! for page access, so the user is sent back through the login flow instead
//! of seeing stale data.

use handlebars::Handlebars;
use log::error;
use rocket::get;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{Responder, State};
use serde_json::{json, Value};

use crate::auth::claims::{session_has_admin, session_roles};
use crate::auth::guard::AuthSession;
use crate::auth::login::AuthError;
use crate::auth::provider::OidcProvider;
use crate::auth::session::{project, PublicSession};
use crate::config::Config;

/// The exits a session-gated page can take.
#[derive(Responder)]
pub enum Page {
    Html(RawHtml<String>),
    #[response(status = 403)]
    Forbidden(RawHtml<String>),
    Redirect(Redirect),
    Failure(Status),
}

/// Render one of the embedded page templates.
///
/// The templates ship inside the binary, so a failure here means a build
/// defect; it is logged and surfaced as a 500 rather than unwinding the
/// request.
fn render_page(name: &str, template: &str, data: &Value) -> Result<RawHtml<String>, Status> {
    let mut handlebars = Handlebars::new();
    if let Err(err) = handlebars.register_template_string(name, template) {
        error!("Failed to register the {} template: {}", name, err);
        return Err(Status::InternalServerError);
    }

    match handlebars.render(name, data) {
        Ok(html) => Ok(RawHtml(html)),
        Err(err) => {
            error!("Failed to render the {} template: {}", name, err);
            Err(Status::InternalServerError)
        }
    }
}

/// Storefront landing page.
#[get("/")]
pub fn index(session: Option<AuthSession>) -> Result<RawHtml<String>, Status> {
    let signed_in = session.as_ref().is_some_and(AuthSession::is_usable);
    render_page(
        "index",
        include_str!("../../resources/templates/index.hbs"),
        &json!({ "signed_in": signed_in }),
    )
}

/// Profile page, the fixed landing route after login.
///
/// Redirects to the login flow when there is no usable session.
#[get("/profile")]
pub fn profile(session: Option<AuthSession>) -> Page {
    let session = match session {
        Some(session) if session.is_usable() => session,
        _ => return Page::Redirect(Redirect::to("/auth/login")),
    };

    let mut roles: Vec<String> = session_roles(&session.record).into_iter().collect();
    roles.sort();

    match render_page(
        "profile",
        include_str!("../../resources/templates/profile.hbs"),
        &json!({
            "roles": roles,
            "has_roles": !roles.is_empty(),
            "is_admin": session_has_admin(&session.record),
        }),
    ) {
        Ok(html) => Page::Html(html),
        Err(status) => Page::Failure(status),
    }
}

/// Admin-only monitoring page embedding the Grafana dashboard.
///
/// Non-admins get a 403 denial page rather than a redirect: they are signed
/// in, they just lack the role, and bouncing them through login again would
/// not change that.
#[get("/admin/monitoring")]
pub fn monitoring(session: Option<AuthSession>, config: &State<Config>) -> Page {
    let session = match session {
        Some(session) if session.is_usable() => session,
        _ => return Page::Redirect(Redirect::to("/auth/login")),
    };

    if !session_has_admin(&session.record) {
        return match render_page(
            "monitoring_denied",
            include_str!("../../resources/templates/monitoring_denied.hbs"),
            &json!({}),
        ) {
            Ok(html) => Page::Forbidden(html),
            Err(status) => Page::Failure(status),
        };
    }

    match render_page(
        "monitoring",
        include_str!("../../resources/templates/monitoring.hbs"),
        &json!({ "embed_url": config.dashboard.embed_url() }),
    ) {
        Ok(html) => Page::Html(html),
        Err(status) => Page::Failure(status),
    }
}

/// Confirmation page after a completed sign-out.
#[get("/logout/success")]
pub fn logout_success() -> Result<RawHtml<String>, Status> {
    render_page(
        "logout_success",
        include_str!("../../resources/templates/logout_success.hbs"),
        &json!({}),
    )
}

/// Error page for a failed sign-out.
#[get("/logout/error?<reason>")]
pub fn logout_error(reason: Option<String>) -> Result<RawHtml<String>, Status> {
    let reason = reason.unwrap_or_else(|| "Logout could not be completed.".to_string());
    render_page(
        "logout_error",
        include_str!("../../resources/templates/logout_error.hbs"),
        &json!({ "reason": reason }),
    )
}

/// Error page for a failed sign-in.
///
/// Unknown codes render the configuration message; the query string is
/// attacker-controlled and must never be echoed into the page.
#[get("/auth/error?<error>")]
pub fn auth_error(error: Option<String>) -> Result<RawHtml<String>, Status> {
    let error = error
        .as_deref()
        .and_then(AuthError::from_code)
        .unwrap_or(AuthError::Configuration);
    render_page(
        "auth_error",
        include_str!("../../resources/templates/auth_error.hbs"),
        &json!({ "code": error.code(), "message": error.message() }),
    )
}

/// Client-facing view of the current session.
///
/// The refresh token and expiry bookkeeping stay server-side; only the
/// projection defined by [`project`] leaves the process.
#[get("/api/session")]
pub fn api_session(session: Option<AuthSession>) -> Result<Json<PublicSession>, Status> {
    match session {
        Some(session) => Ok(Json(project(&session.record))),
        None => Err(Status::Unauthorized),
    }
}

/// Proxy to the provider's userinfo endpoint using the session's token.
#[get("/api/userinfo")]
pub async fn api_userinfo(
    session: Option<AuthSession>,
    provider: &State<OidcProvider>,
) -> Result<Json<Value>, Status> {
    let session = match session {
        Some(session) if session.is_usable() => session,
        _ => return Err(Status::Unauthorized),
    };
    let Some(access_token) = session.record.access_token.as_deref() else {
        return Err(Status::Unauthorized);
    };

    match provider.fetch_userinfo(access_token).await {
        Ok(document) => Ok(Json(document)),
        Err(err) => {
            error!("Userinfo lookup failed: {}", err);
            Err(Status::BadGateway)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failure_is_a_500_not_a_panic() {
        let result = render_page("broken", "{{#if unclosed}}", &json!({}));
        assert_eq!(result.unwrap_err(), Status::InternalServerError);
    }

    #[test]
    fn valid_template_renders() {
        let result = render_page("greeting", "Hello {{name}}", &json!({"name": "world"}));
        assert_eq!(result.expect("renders").0, "Hello world");
    }
}
