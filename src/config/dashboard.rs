// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the embedded Grafana monitoring view

use serde::{Deserialize, Serialize};

/// Settings for the admin-only monitoring page.
///
/// The page embeds a Grafana dashboard in kiosk mode; these values are
/// interpolated into the iframe URL only, never used for authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL of the Grafana instance.
    #[serde(default = "default_grafana_url")]
    pub grafana_url: String,

    /// UID of the dashboard to embed.
    #[serde(default = "default_dashboard_uid")]
    pub dashboard_uid: String,

    /// Slug of the dashboard to embed.
    #[serde(default = "default_dashboard_slug")]
    pub dashboard_slug: String,

    /// Auto-refresh interval (Grafana syntax, e.g. `5s`).
    #[serde(default = "default_refresh")]
    pub refresh: String,

    /// Start of the displayed time range.
    #[serde(default = "default_from")]
    pub from: String,

    /// End of the displayed time range.
    #[serde(default = "default_to")]
    pub to: String,
}

fn default_grafana_url() -> String {
    "http://localhost:3002".to_string()
}

fn default_dashboard_uid() -> String {
    "api-logs".to_string()
}

fn default_dashboard_slug() -> String {
    "api-logs-dashboard".to_string()
}

fn default_refresh() -> String {
    "5s".to_string()
}

fn default_from() -> String {
    "now-1h".to_string()
}

fn default_to() -> String {
    "now".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            grafana_url: default_grafana_url(),
            dashboard_uid: default_dashboard_uid(),
            dashboard_slug: default_dashboard_slug(),
            refresh: default_refresh(),
            from: default_from(),
            to: default_to(),
        }
    }
}

impl DashboardConfig {
    /// Build the kiosk-mode iframe URL for the embedded dashboard.
    pub fn embed_url(&self) -> String {
        let base = self.grafana_url.trim_end_matches('/');
        format!(
            "{}/d/{}/{}?{}",
            base,
            self.dashboard_uid,
            self.dashboard_slug,
            serde_urlencoded::to_string([
                ("kiosk", "tv"),
                ("refresh", self.refresh.as_str()),
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
            ])
            .unwrap_or_default()
        )
    }
}
