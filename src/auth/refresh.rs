// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Silent access-token refresh
//!
//! When a user's access token expires (typically after an hour) the session
//! record is rewritten with a fresh token obtained through the refresh-token
//! grant, so the user keeps browsing without re-authenticating.
//!
//! Failures never propagate past this boundary: a failed refresh records the
//! [`SessionError::RefreshAccessTokenError`] sentinel on the session and
//! leaves the previous token values untouched, degrading the session so the
//! next protected access forces a re-login.
//!
//! The operation is safe to invoke redundantly — several concurrent requests
//! may observe the same expired record and each run a refresh. The final
//! record state is the same either way; with refresh-token rotation enabled
//! the provider may invalidate a losing call's token, which is an accepted
//! race (last writer wins on the cookie).

use chrono::Utc;
use log::{debug, error};

use super::provider::{OidcProvider, DEFAULT_TOKEN_LIFETIME_SECS};
use super::session::{SessionError, SessionRecord};

/// Refresh a session record if its access token has expired.
///
/// Returns the record unchanged — and performs no network call — while
/// `expires_at` lies in the future. A record without `expires_at` is treated
/// as expired.
pub async fn ensure_fresh(record: SessionRecord, provider: &OidcProvider) -> SessionRecord {
    let now = Utc::now().timestamp_millis();
    if record.expires_at.is_some_and(|expires_at| now < expires_at) {
        return record;
    }

    refresh_access_token(record, provider).await
}

/// Exchange the record's refresh token for a new access token.
///
/// On success the access token and expiry are replaced, the refresh token is
/// replaced only when the provider rotated it, and the error flag is
/// cleared. On any failure the error sentinel is set and every other field
/// keeps its previous value (no partial overwrite).
pub async fn refresh_access_token(
    mut record: SessionRecord,
    provider: &OidcProvider,
) -> SessionRecord {
    let Some(refresh_token) = record.refresh_token.clone() else {
        error!("No refresh token available for refresh");
        record.error = Some(SessionError::RefreshAccessTokenError);
        return record;
    };

    match provider.refresh(&refresh_token).await {
        Ok(tokens) => {
            debug!("Access token refreshed");
            let now = Utc::now().timestamp_millis();
            let lifetime = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
            record.access_token = Some(tokens.access_token);
            record.expires_at = Some(now + lifetime * 1000);
            // Refresh-token rotation is provider-dependent; keep the old one
            // unless a replacement was issued.
            if let Some(rotated) = tokens.refresh_token {
                record.refresh_token = Some(rotated);
            }
            record.error = None;
            record
        }
        Err(err) => {
            error!("Token refresh failed: {}", err);
            record.error = Some(SessionError::RefreshAccessTokenError);
            record
        }
    }
}
