// src/crypto/aes_gcm.rs
//! v2 codec: AES-256-GCM behind a `v2:` envelope
//!
//! Envelope text is `v2:` + base64(nonce ‖ ciphertext ‖ tag). The AES key is
//! the SHA-256 digest of the user's key string.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::aliases::EncryptionKey;
use crate::consts::{V2_ENVELOPE_PREFIX, V2_NONCE_LEN};
use crate::error::CodecError;

const TAG_LEN: usize = 16;

fn derive_key(key: &EncryptionKey) -> Result<[u8; 32], CodecError> {
    if key.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    let digest = Sha256::digest(key.expose_secret().as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

fn cipher_for(key: &EncryptionKey) -> Result<Aes256Gcm, CodecError> {
    let key_bytes = derive_key(key)?;
    Aes256Gcm::new_from_slice(&key_bytes).map_err(|e| CodecError::Envelope(e.to_string()))
}

/// Encrypt under a fresh random nonce and wrap in a v2 envelope
pub fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<String, CodecError> {
    let cipher = cipher_for(key)?;
    let mut nonce = [0u8; V2_NONCE_LEN];
    rand::rng().fill(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CodecError::Authentication)?;

    let mut raw = Vec::with_capacity(V2_NONCE_LEN + sealed.len());
    raw.extend_from_slice(&nonce);
    raw.extend_from_slice(&sealed);
    Ok(format!("{V2_ENVELOPE_PREFIX}{}", STANDARD.encode(raw)))
}

/// Unwrap and authenticate a v2 envelope
pub fn open(envelope: &str, key: &EncryptionKey) -> Result<Vec<u8>, CodecError> {
    let cipher = cipher_for(key)?;
    let body = envelope
        .trim()
        .strip_prefix(V2_ENVELOPE_PREFIX)
        .ok_or_else(|| CodecError::Envelope("missing v2 prefix".into()))?;
    let raw = STANDARD.decode(body)?;
    if raw.len() < V2_NONCE_LEN + TAG_LEN {
        return Err(CodecError::Envelope(format!(
            "envelope too short ({} bytes)",
            raw.len()
        )));
    }
    let (nonce, sealed) = raw.split_at(V2_NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CodecError::Authentication)
}
