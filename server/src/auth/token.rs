//! Opaque session tokens. Only the SHA-256 digest is persisted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A freshly minted token and the digest to store for it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub digest: Vec<u8>,
}

pub fn issue() -> IssuedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    let digest = digest(&token);
    IssuedToken { token, digest }
}

pub fn digest(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}
