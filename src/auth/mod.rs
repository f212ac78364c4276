// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication and session lifecycle
//!
//! This module owns everything between the browser and the OIDC provider:
//!
//! - [`login`]: authorization-code flow with PKCE and session establishment
//! - [`session`]: the session record, its JWT encoding and the cookies
//! - [`refresh`]: transparent access-token refresh with the error sentinel
//! - [`guard`]: the [`guard::AuthSession`] request guard handlers consume
//! - [`claims`]: role and group extraction from provider tokens
//! - [`logout`]: the two-leg CSRF-protected sign-out flow
//! - [`provider`]: the HTTP client talking to the provider endpoints
//! - [`pkce`]: PKCE verifier/challenge generation

pub mod claims;
pub mod guard;
pub mod login;
pub mod logout;
pub mod pkce;
pub mod provider;
pub mod refresh;
pub mod session;
