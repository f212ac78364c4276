// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claims extraction from identity provider tokens
//!
//! This module decodes the payload of a signed token and derives the
//! authorization facts the UI needs: the set of role names granted to the
//! user, and whether the user holds the `admin` role.
//!
//! ## Trust model
//!
//! The payload is decoded **without signature verification**. Verification is
//! delegated to the identity provider's own validation during token issuance
//! and refresh; these helpers drive UI authorization decisions only and are
//! not a trust boundary for API access.
//!
//! ## ZITADEL claim shapes
//!
//! Role claims arrive under namespaced keys:
//!
//! - `urn:zitadel:iam:org:project:roles` (legacy, exact)
//! - `urn:zitadel:iam:org:projects:roles` (pluralized variant)
//! - `urn:zitadel:iam:org:project:<id>:roles` (project-scoped)
//!
//! Each claim value maps role names to grant metadata. Some instances wrap
//! the role mapping in an extra level keyed by a numeric project id; those
//! wrapper keys must not be mistaken for role names. The traversal is bounded
//! to one nested level — the provider's claim shape is a finite, documented
//! contract, so no general recursive walker is used.

use std::collections::HashSet;

use base64::Engine;
use serde_json::{Map, Value};

use super::session::SessionRecord;

/// Exact legacy role-claim key.
const PROJECT_ROLES_CLAIM: &str = "urn:zitadel:iam:org:project:roles";
/// Pluralized role-claim key used by newer ZITADEL versions.
const PROJECTS_ROLES_CLAIM: &str = "urn:zitadel:iam:org:projects:roles";
/// Prefix of the project-scoped role-claim keys.
const PROJECT_CLAIM_PREFIX: &str = "urn:zitadel:iam:org:project:";

/// Decode the payload segment of a JWT without verifying its signature.
///
/// Splits the token on `.`, base64url-decodes the second segment (padding
/// accepted or absent) and parses it as a JSON object.
///
/// Returns `None` on any malformation — fewer than two segments, invalid
/// base64, invalid JSON, or a payload that is not a JSON object. This
/// function never panics; callers treat `None` as "no roles, not admin".
pub fn decode_jwt_payload(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    if payload.is_empty() {
        return None;
    }

    // Tokens in the wild are sometimes padded; strip before decoding.
    let payload = payload.trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;

    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Check whether a top-level claim key carries ZITADEL role grants.
fn is_role_claim_key(key: &str) -> bool {
    key == PROJECT_ROLES_CLAIM
        || key == PROJECTS_ROLES_CLAIM
        || (key.starts_with(PROJECT_CLAIM_PREFIX) && key.ends_with(":roles"))
}

/// Check whether a key looks like a numeric project identifier.
///
/// ZITADEL project ids are long decimal strings; role names never are.
fn looks_like_project_id(key: &str) -> bool {
    key.len() >= 10 && key.chars().all(|c| c.is_ascii_digit())
}

/// Collect the role names granted in a claims payload.
///
/// Scans every role claim, taking first-level keys as role names except
/// numeric project-id wrapper keys. Object values are scanned one additional
/// level under the same exclusion, so both flat and project-id-wrapped claim
/// shapes yield their role names. String entries of a top-level `groups`
/// array are merged in. The result is deduplicated and unordered.
pub fn extract_roles(payload: Option<&Map<String, Value>>) -> HashSet<String> {
    let mut roles = HashSet::new();
    let Some(payload) = payload else {
        return roles;
    };

    for (_, value) in payload.iter().filter(|(key, _)| is_role_claim_key(key)) {
        let Some(claim) = value.as_object() else {
            continue;
        };
        for (role_name, role_value) in claim {
            if !looks_like_project_id(role_name) {
                roles.insert(role_name.clone());
            }
            if let Some(nested) = role_value.as_object() {
                for nested_name in nested.keys() {
                    if !looks_like_project_id(nested_name) {
                        roles.insert(nested_name.clone());
                    }
                }
            }
        }
    }

    if let Some(groups) = payload.get("groups").and_then(Value::as_array) {
        for group in groups {
            if let Some(name) = group.as_str() {
                roles.insert(name.to_string());
            }
        }
    }

    roles
}

/// Check whether a claims payload grants the `admin` role.
///
/// Looks for a literal `"admin"` key at the top level of any role-claim
/// mapping or one nested level deep, or the string `"admin"` in a top-level
/// `groups` array. This check is intentionally independent of
/// [`extract_roles`] and applies no project-id filter: a spurious positive
/// from an unlikely all-digit role named `admin` cannot occur, and keeping
/// the check self-contained makes it robust against changes in the role
/// enumeration logic.
pub fn has_admin_role(payload: Option<&Map<String, Value>>) -> bool {
    let Some(payload) = payload else {
        return false;
    };

    for (_, value) in payload.iter().filter(|(key, _)| is_role_claim_key(key)) {
        let Some(claim) = value.as_object() else {
            continue;
        };
        if claim.contains_key("admin") {
            return true;
        }
        // Roles may be nested one level under a project id.
        for nested in claim.values() {
            if nested
                .as_object()
                .is_some_and(|map| map.contains_key("admin"))
            {
                return true;
            }
        }
    }

    payload
        .get("groups")
        .and_then(Value::as_array)
        .is_some_and(|groups| groups.iter().any(|g| g.as_str() == Some("admin")))
}

/// Role names for a session, preferring identity-token claims.
///
/// The identity token is the authoritative source; the access token is
/// consulted only when the identity token yields zero roles (some providers
/// emit role claims only on one of the two).
pub fn session_roles(record: &SessionRecord) -> HashSet<String> {
    let id_payload = record.id_token.as_deref().and_then(decode_jwt_payload);
    let roles = extract_roles(id_payload.as_ref());
    if !roles.is_empty() {
        return roles;
    }

    let access_payload = record.access_token.as_deref().and_then(decode_jwt_payload);
    extract_roles(access_payload.as_ref())
}

/// Check whether either of a session's tokens grants the `admin` role.
pub fn session_has_admin(record: &SessionRecord) -> bool {
    let id_payload = record.id_token.as_deref().and_then(decode_jwt_payload);
    if has_admin_role(id_payload.as_ref()) {
        return true;
    }

    let access_payload = record.access_token.as_deref().and_then(decode_jwt_payload);
    has_admin_role(access_payload.as_ref())
}
