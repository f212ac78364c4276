// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web server assembly
//!
//! Builds the Rocket instance from the validated configuration: managed
//! state ([`Config`] and [`OidcProvider`]), the authentication and page
//! routes, and the server figment including optional TLS from base64
//! certificates in the configuration file.

pub mod pages;

use anyhow::Result;
use base64::Engine;
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use crate::auth::provider::OidcProvider;
use crate::auth::{login, logout};
use crate::config::Config;

/// Assemble the Rocket instance with all routes and managed state.
///
/// Fails when the configured issuer URLs do not parse; this is the last
/// point where a bad provider configuration can be rejected before the
/// server starts accepting requests.
pub fn build_rocket(figment: Figment, config: Config) -> Result<Rocket<Build>> {
    let provider = OidcProvider::new(&config.oidc)?;

    Ok(rocket::custom(figment)
        .mount(
            "/",
            routes![
                pages::index,
                pages::profile,
                pages::monitoring,
                pages::logout_success,
                pages::logout_error,
                pages::auth_error,
                pages::api_session,
                pages::api_userinfo,
                login::login,
                login::login_callback,
                logout::logout,
                logout::logout_callback,
            ],
        )
        .manage(config)
        .manage(provider))
}

/// Start the storefront web server.
pub async fn start_server(config: &Config) -> Result<()> {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.server.name.clone()))
        .merge(("limits", Limits::new().limit("json", 2.mebibytes())))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("secret_key", config.server.session_secret.clone()))
        .merge(("log_level", LogLevel::Normal));

    // Configure TLS if certificates are provided
    if let (Some(cert), Some(key)) = (&config.server.cert, &config.server.key) {
        log::debug!("SSL certificates found in configuration, enabling TLS");

        // Decode base64 certificates
        let cert_data = base64::engine::general_purpose::STANDARD.decode(cert)?;
        let key_data = base64::engine::general_purpose::STANDARD.decode(key)?;

        // Create temporary files for the certificates
        let temp_dir = std::env::temp_dir();
        let cert_path = temp_dir.join("server.crt");
        let key_path = temp_dir.join("server.key");

        // Write the certificates to temporary files
        std::fs::write(&cert_path, cert_data)?;
        std::fs::write(&key_path, key_data)?;

        figment = figment
            .merge(("tls.certs", cert_path))
            .merge(("tls.key", key_path));

        log::info!("TLS enabled for web server");
    }

    let rocket = build_rocket(figment, config.clone())?;
    rocket.launch().await?;
    Ok(())
}
