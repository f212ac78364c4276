// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the storefront application
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the storefront frontend. The configuration is
//! backed by a YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The application's configuration is organized as a nested structure with
//! sections:
//! - `server`: network binding, TLS and cookie security for the web server
//! - `oidc`: identity-provider coordinates and session settings
//! - `dashboard`: the embedded Grafana monitoring view
//!
//! ## Security Features
//!
//! Security-relevant values (issuer, client id, client secret, session
//! secret) are never silently defaulted: loading fails fast with a
//! descriptive error when they are missing, and a sample configuration file
//! is written next to the rejected one for the operator to edit.
//!
//! ## Usage
//!
//! ```no_run
//! use storefront::config::Config;
//! use std::path::Path;
//!
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                  // Web port
//!     Some("0.0.0.0".to_string()), // Web address
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod dashboard;
pub mod oidc;
pub mod server;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use dashboard::DashboardConfig;
pub use oidc::OidcConfig;
pub use server::ServerConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure for the storefront application.
///
/// Designed to be deserialized from and serialized to YAML using the serde
/// framework, and validated against a JSON schema before deserialization so
/// malformed files are rejected with a precise error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the web server component.
    #[serde(default)]
    pub server: ServerConfig,

    /// Settings for the OIDC identity-provider integration.
    ///
    /// This section carries the issuer URLs, client credentials and session
    /// parameters. The required values have no usable defaults and must be
    /// provided in the configuration file.
    #[serde(default)]
    pub oidc: OidcConfig,

    /// Settings for the embedded admin monitoring dashboard.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Creating sample configuration file at {:?}", path);
        let sample_path = path.with_extension("sample.yaml");

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// When the file does not exist, a default configuration is written to
    /// the given path and loading fails: the defaults deliberately omit the
    /// identity-provider credentials, which must be filled in by hand.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            anyhow::bail!(
                "Configuration file created at {}; fill in the oidc section (issuer, \
                 client_id, client_secret) and the server session_secret",
                path.display()
            );
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        // Create the validator
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        // Validate before deserializing to Config
        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            // We generate a config.sample.yaml file with the default values
            // for the user to edit
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                match Self::create_sample_config(path) {
                    Ok(_) => debug!("Successfully created sample config"),
                    Err(e) => error!("Failed to create sample config: {}", e),
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// External base URL of this deployment, without a trailing slash.
    ///
    /// Used to build absolute OAuth redirect URIs. Falls back to the bind
    /// address when no canonical URL is configured, which only works for
    /// local development.
    pub fn external_base_url(&self) -> String {
        if let Some(base) = self
            .oidc
            .public_base_url
            .as_deref()
            .and_then(|raw| url::Url::parse(raw).ok())
        {
            return base.as_str().trim_end_matches('/').to_string();
        }

        let scheme = if self.server.cert.is_some() {
            "https"
        } else {
            "http"
        };
        format!("{}://{}:{}", scheme, self.server.address, self.server.port)
    }

    /// Landing URL registered with the provider for the end-session redirect.
    pub fn post_logout_redirect_uri(&self) -> String {
        self.oidc
            .post_logout_redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/logout/callback", self.external_base_url()))
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided on the command line override the
    /// existing configuration.
    ///
    /// # Parameters
    ///
    /// * `web_port` - TCP port for the web server
    /// * `web_address` - Network address for the web server to bind to
    pub fn apply_args(&mut self, web_port: Option<u16>, web_address: Option<String>) {
        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.server.port = web_port;
        }

        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.server.address = web_address;
        }
    }
}
