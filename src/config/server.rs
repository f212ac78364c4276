// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the storefront web server

use serde::{Deserialize, Serialize};

/// Settings controlling network binding, TLS and cookie security for the
/// web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server identity reported in the `Server` header.
    #[serde(default = "default_name")]
    pub name: String,

    /// Network address to bind to.
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional base64-encoded PEM TLS certificate.
    #[serde(default)]
    pub cert: Option<String>,

    /// Optional base64-encoded PEM TLS key.
    #[serde(default)]
    pub key: Option<String>,

    /// Base64-encoded secret used for the session JWT and Rocket's private
    /// cookies. Must decode to at least 32 bytes; never defaulted.
    #[serde(default)]
    pub session_secret: String,

    /// Mark session and logout cookies `Secure`. Enable in any
    /// production-like deployment served over HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_name() -> String {
    "Storefront".to_string()
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            address: default_address(),
            port: default_port(),
            cert: None,
            key: None,
            session_secret: String::new(),
            secure_cookies: false,
        }
    }
}
