// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;
use url::Url;

use super::Config;

/// Minimum decoded length of the session secret, in bytes.
const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./storefront --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    // Pretty-print the schema
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    // Output to stdout
    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Check that a string parses as an absolute http(s) URL with a host.
fn is_valid_base_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Validates the configuration against additional rules that aren't covered
/// by the JSON schema.
///
/// This function performs deeper validation checks that can't be easily
/// expressed in a JSON schema. Security-relevant identity-provider values
/// are required here and never silently defaulted.
///
/// # Validation Rules
///
/// - **SSL Configuration**: a certificate requires a key (and vice versa),
///   both base64-encoded
/// - **Port Range**: the server port must be within 1-65534
/// - **IP Address Format**: the bind address should be a valid IP or a
///   special value
/// - **Session Secret**: required, base64, decoding to at least 32 bytes
/// - **OIDC Settings**: issuer (and internal issuer, when given) must be
///   absolute http(s) URLs; client id and client secret are required;
///   `public_base_url` and `post_logout_redirect_uri` must be valid URLs
///   when present; the session duration must be non-zero
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    // Validate SSL certificates
    if let Some(cert) = &config.server.cert {
        if config.server.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }

        // Validate the cert is valid base64
        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.server.key {
        if config.server.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }

        // Validate the key is valid base64
        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    // Check value ranges for certain fields
    if config.server.port < 1 || config.server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    // Check if the address is in a valid format
    if !is_valid_ip_address(&config.server.address) {
        debug!(
            "Potentially invalid address format: {}",
            config.server.address
        );
        // Just issue a warning but don't block
    }

    // The session secret protects the private cookies and the session JWT;
    // an empty or short secret must never launch.
    if config.server.session_secret.is_empty() {
        anyhow::bail!(
            "server.session_secret is required, generate one with: openssl rand -base64 32"
        );
    }
    let secret_bytes = base64::engine::general_purpose::STANDARD
        .decode(&config.server.session_secret)
        .context("server.session_secret is not valid base64")?;
    if secret_bytes.len() < MIN_SESSION_SECRET_BYTES {
        anyhow::bail!(
            "server.session_secret must decode to at least {} bytes",
            MIN_SESSION_SECRET_BYTES
        );
    }

    // Identity-provider coordinates: required, never defaulted.
    if config.oidc.issuer.is_empty() {
        anyhow::bail!("oidc.issuer is required");
    }
    if !is_valid_base_url(&config.oidc.issuer) {
        anyhow::bail!("oidc.issuer is not a valid http(s) URL: {}", config.oidc.issuer);
    }
    if let Some(internal) = &config.oidc.internal_issuer {
        if !is_valid_base_url(internal) {
            anyhow::bail!(
                "oidc.internal_issuer is not a valid http(s) URL: {}",
                internal
            );
        }
    }
    if config.oidc.client_id.is_empty() {
        anyhow::bail!("oidc.client_id is required");
    }
    if config.oidc.client_secret.is_empty() {
        anyhow::bail!("oidc.client_secret is required");
    }

    if let Some(base_url) = &config.oidc.public_base_url {
        if !is_valid_base_url(base_url) {
            anyhow::bail!(
                "oidc.public_base_url is not a valid http(s) URL: {}",
                base_url
            );
        }
    }
    if let Some(redirect) = &config.oidc.post_logout_redirect_uri {
        if !is_valid_base_url(redirect) {
            anyhow::bail!(
                "oidc.post_logout_redirect_uri is not a valid http(s) URL: {}",
                redirect
            );
        }
    }

    if config.oidc.session_duration == 0 {
        anyhow::bail!("oidc.session_duration must be greater than zero");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.server.session_secret = "/qCJ7RyQIugza05wgFNN6R+c2/afrKlG5jJfZ0oQPis=".to_string();
        config.oidc.issuer = "http://localhost:8080".to_string();
        config.oidc.client_id = "storefront-client".to_string();
        config.oidc.client_secret = "storefront-secret".to_string();
        config
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_specific_rules(&valid_config()).is_ok());
    }

    #[test]
    fn missing_client_credentials_are_rejected() {
        let mut config = valid_config();
        config.oidc.client_id = String::new();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = valid_config();
        config.oidc.client_secret = String::new();
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn missing_or_short_session_secret_is_rejected() {
        let mut config = valid_config();
        config.server.session_secret = String::new();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = valid_config();
        config.server.session_secret =
            base64::engine::general_purpose::STANDARD.encode("short");
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn invalid_issuer_is_rejected() {
        let mut config = valid_config();
        config.oidc.issuer = "not a url".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let mut config = valid_config();
        config.server.cert = Some(base64::engine::general_purpose::STANDARD.encode("cert"));
        assert!(validate_specific_rules(&config).is_err());
    }
}
