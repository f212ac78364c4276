// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PKCE (Proof Key for Code Exchange) challenge generation
//!
//! The authorization-code flow carries an S256 code challenge so an
//! intercepted code cannot be redeemed without the matching verifier.

use base64::Engine;
use sha2::{Digest, Sha256};

/// Challenge method sent to the provider; always S256.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// A PKCE verifier and its derived S256 challenge.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Secret verifier, presented at the token endpoint.
    pub verifier: String,
    /// `base64url(sha256(verifier))`, presented at the authorize endpoint.
    pub challenge: String,
}

/// Generate a fresh PKCE verifier/challenge pair.
///
/// The verifier is 32 random bytes hex-encoded (64 characters, within the
/// RFC 7636 43..=128 length window).
pub fn generate_pkce_challenge() -> PkceChallenge {
    let verifier: String = rand::random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());

    PkceChallenge {
        verifier,
        challenge,
    }
}
