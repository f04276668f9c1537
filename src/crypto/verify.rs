// src/crypto/verify.rs
//! Verification gate: decrypt fresh ciphertext and compare it with the source

use serde::de::DeserializeOwned;
use tracing::debug;

use super::decrypt;
use crate::aliases::EncryptionKey;

/// Decrypt `ciphertext` and compare it with what was meant to be stored
///
/// Never errors: any decode failure or difference is simply `false`.
pub fn verify<T>(original: &T, key: &EncryptionKey, ciphertext: &str) -> bool
where
    T: DeserializeOwned + PartialEq,
{
    match decrypt::<T>(ciphertext, key) {
        Ok(decoded) => decoded == *original,
        Err(err) => {
            debug!(error = %err, "verification decode failed");
            false
        }
    }
}
