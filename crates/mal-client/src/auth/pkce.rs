//! PKCE (Proof Key for Code Exchange) material for the authorization flow
//!
//! MAL announces `code_challenge_method=plain`, so whatever value goes into the
//! authorization URL as `code_challenge` must come back verbatim as the
//! `code_verifier` in the token exchange. The pair generated here keeps the
//! S256 derivation so the challenge is still an unguessable 43-character
//! string; see [`PkcePair::exchange_verifier`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Code verifier and the challenge derived from it.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh random pair.
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Value sent as `code_verifier` during the code exchange.
    ///
    /// This is the challenge, not the verifier: with the `plain` method the
    /// provider compares the two fields directly, and sending the verifier is
    /// rejected.
    pub fn exchange_verifier(&self) -> &str {
        &self.challenge
    }
}

/// Generate a cryptographically random code verifier.
///
/// 96 random bytes encode to exactly 128 URL-safe base64 characters, the
/// upper bound RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 96];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate the opaque `state` value used for CSRF protection.
///
/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
