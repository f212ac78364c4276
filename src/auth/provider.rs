// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Outbound client for the OIDC identity provider
//!
//! All network traffic to the provider goes through [`OidcProvider`]: the
//! authorization-code exchange, the refresh-token grant, and the userinfo
//! lookup, plus construction of the browser-facing authorization and
//! end-session URLs.
//!
//! ## Split-horizon deployments
//!
//! The provider may be reached over an internal address distinct from its
//! externally advertised issuer (e.g. a Docker service name while browsers
//! see `localhost`). Server-to-server calls therefore target the *internal*
//! issuer but present the *public* issuer's host in the `Host` header — the
//! provider selects its instance by the presented hostname, not by the
//! connection address. Browser-facing URLs always use the public issuer.
//!
//! Every transport or protocol failure is converted to [`ProviderError`] at
//! this boundary; raw reqwest errors never reach the handler layer.

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use url::Url;

use crate::config::OidcConfig;

/// Access-token lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Timeout applied to every provider call. A single failed attempt surfaces
/// immediately as an error state; there is no retry, since silently retrying
/// an auth failure risks masking a revoked session.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How much of an error response body is kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Errors produced at the identity-provider call boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid issuer URL ({url}): {source}")]
    InvalidIssuer {
        url: String,
        source: url::ParseError,
    },
    #[error("Issuer URL has no host: {0}")]
    IssuerWithoutHost(String),
    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Identity provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Token response missing access_token")]
    MissingAccessToken,
}

/// Token set returned by the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

/// Raw token-endpoint response; `access_token` is checked after decoding so
/// a 2xx response without one maps to [`ProviderError::MissingAccessToken`].
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    id_token: Option<String>,
}

/// Configured client for one identity provider.
///
/// Constructed once from the validated [`OidcConfig`] and shared through
/// Rocket's managed state; components receive it explicitly instead of
/// reading provider settings from the environment.
pub struct OidcProvider {
    http: reqwest::Client,
    config: OidcConfig,
    /// `host[:port]` of the public issuer, presented as the `Host` header
    /// on internal-address calls.
    public_host: String,
}

impl OidcProvider {
    /// Build a provider client, validating the issuer URLs up front.
    pub fn new(config: &OidcConfig) -> Result<Self, ProviderError> {
        let issuer = parse_issuer(&config.issuer)?;
        let host = issuer
            .host_str()
            .ok_or_else(|| ProviderError::IssuerWithoutHost(config.issuer.clone()))?;
        let public_host = match issuer.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        if let Some(internal) = &config.internal_issuer {
            parse_issuer(internal)?;
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
            public_host,
        })
    }

    /// The issuer browsers are redirected to.
    pub fn public_issuer(&self) -> &str {
        self.config.issuer.trim_end_matches('/')
    }

    /// The issuer used for server-to-server calls; falls back to the public
    /// issuer when no internal address is configured.
    pub fn internal_issuer(&self) -> &str {
        self.config
            .internal_issuer
            .as_deref()
            .unwrap_or(&self.config.issuer)
            .trim_end_matches('/')
    }

    /// Host presented to the provider on internal-address calls.
    pub fn public_host(&self) -> &str {
        &self.public_host
    }

    /// Build the authorization-endpoint URL for the login redirect.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str, code_challenge: &str) -> Url {
        let mut url = Url::parse(&format!("{}/oauth/v2/authorize", self.public_issuer()))
            .expect("validated issuer URL");
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.config.scopes)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", super::pkce::CODE_CHALLENGE_METHOD);
        url
    }

    /// Build the end-session URL for logout Leg A.
    ///
    /// The identity-token hint tells the provider which session to end; the
    /// state value is validated on the callback.
    pub fn end_session_url(&self, id_token_hint: &str, redirect_uri: &str, state: &str) -> Url {
        let mut url = Url::parse(&format!("{}/oidc/v1/end_session", self.public_issuer()))
            .expect("validated issuer URL");
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token_hint)
            .append_pair("post_logout_redirect_uri", redirect_uri)
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for a token set.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, ProviderError> {
        debug!("Exchanging authorization code at the token endpoint");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ])
        .await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        debug!("Refreshing access token at the token endpoint");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ])
        .await
    }

    /// Fetch the provider's userinfo document with a bearer token.
    pub async fn fetch_userinfo(
        &self,
        access_token: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/oidc/v1/userinfo", self.internal_issuer());
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::HOST, &self.public_host)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        Ok(response.json().await?)
    }

    /// POST form parameters to the token endpoint and decode the token set.
    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenSet, ProviderError> {
        let url = format!("{}/oauth/v2/token", self.internal_issuer());
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::HOST, &self.public_host)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let decoded: TokenEndpointResponse = response.json().await?;
        let access_token = decoded
            .access_token
            .ok_or(ProviderError::MissingAccessToken)?;
        Ok(TokenSet {
            access_token,
            expires_in: decoded.expires_in,
            refresh_token: decoded.refresh_token,
            id_token: decoded.id_token,
        })
    }
}

fn parse_issuer(raw: &str) -> Result<Url, ProviderError> {
    Url::parse(raw).map_err(|source| ProviderError::InvalidIssuer {
        url: raw.to_string(),
        source,
    })
}

fn truncate(body: &str) -> String {
    let mut end = body.len().min(ERROR_BODY_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
