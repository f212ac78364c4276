// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the OIDC identity provider
//!
//! All provider coordinates live here and are resolved once at startup;
//! components receive the validated configuration explicitly instead of
//! reading the environment. The security-relevant values (issuer, client id,
//! client secret, session secret) are never silently defaulted — see
//! [`super::utils::validate_specific_rules`].

use serde::{Deserialize, Serialize};

/// Settings for the OIDC relying-party integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Public issuer URL, used in browser redirects and as the `iss` claim
    /// browsers will see (e.g. `http://localhost:8080`).
    #[serde(default)]
    pub issuer: String,

    /// Optional internal issuer address for server-to-server calls when the
    /// provider is reached through a different network path than its public
    /// identity (e.g. `http://zitadel:8080` inside Docker). The public host
    /// is still presented in the `Host` header.
    #[serde(default)]
    pub internal_issuer: Option<String>,

    /// OAuth2 client identifier. Required.
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret. Required.
    #[serde(default)]
    pub client_secret: String,

    /// Space-separated scopes requested at login.
    #[serde(default = "default_scopes")]
    pub scopes: String,

    /// Canonical external base URL of this application (e.g.
    /// `http://localhost:3000`). Used for OAuth redirect URIs and as the
    /// logout callback's redirect origin; when absent or invalid, redirects
    /// fall back to paths relative to the request origin.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Explicit post-logout redirect URI registered with the provider.
    /// Defaults to `{public_base_url}/logout/callback`.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,

    /// Lifetime of the local session container, in seconds.
    #[serde(default = "default_session_duration")]
    pub session_duration: u64,
}

fn default_scopes() -> String {
    "openid profile email offline_access urn:zitadel:iam:org:projects:roles".to_string()
}

fn default_session_duration() -> u64 {
    3600
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            internal_issuer: None,
            client_id: String::new(),
            client_secret: String::new(),
            scopes: default_scopes(),
            public_base_url: None,
            post_logout_redirect_uri: None,
            session_duration: default_session_duration(),
        }
    }
}
