// src/crypto/legacy.rs
//! v1 codec: repeating-key XOR keystream, standard base64 output
//!
//! Not semantically secure. Identical plaintext prefixes under one key
//! produce identical ciphertext prefixes and nothing authenticates the
//! result. It exists so entries written by earlier deployments still decode.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::aliases::EncryptionKey;
use crate::error::CodecError;

/// Keystream bytes for `key`: each character's UTF-16 code unit, low byte
fn keystream(key: &EncryptionKey) -> Result<Vec<u8>, CodecError> {
    let stream: Vec<u8> = key
        .expose_secret()
        .encode_utf16()
        .map(|unit| (unit & 0xff) as u8)
        .collect();
    if stream.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    Ok(stream)
}

/// XOR `bytes` in place against the key repeated to their length
pub fn apply_keystream(bytes: &mut [u8], key: &EncryptionKey) -> Result<(), CodecError> {
    let stream = keystream(key)?;
    for (byte, k) in bytes.iter_mut().zip(stream.iter().cycle()) {
        *byte ^= k;
    }
    Ok(())
}

/// Plaintext bytes → base64 ciphertext
pub fn encrypt_bytes(plaintext: &[u8], key: &EncryptionKey) -> Result<String, CodecError> {
    let mut buf = plaintext.to_vec();
    apply_keystream(&mut buf, key)?;
    Ok(STANDARD.encode(buf))
}

/// base64 ciphertext → plaintext bytes
pub fn decrypt_bytes(ciphertext: &str, key: &EncryptionKey) -> Result<Vec<u8>, CodecError> {
    // Check the key first so an empty key is reported as such, not as bad base64
    keystream(key)?;
    let mut buf = STANDARD.decode(ciphertext.trim())?;
    apply_keystream(&mut buf, key)?;
    Ok(buf)
}
