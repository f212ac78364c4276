//! Storefront library
//!
//! This library provides a web storefront frontend with OIDC sign-in,
//! transparent access-token refresh, a CSRF-protected logout flow and an
//! embedded admin monitoring dashboard.

pub mod auth;
pub mod config;
pub mod web;
