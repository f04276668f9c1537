// src/aliases.rs
//! Secret wrapper types used throughout journal-vault

use std::fmt;

use zeroize::Zeroize;

use crate::consts::KEY_FINGERPRINT_HEX;

/// A per-user encryption key; zeroized on drop, redacted in `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key text. Keep the borrow short.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short BLAKE3 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hex = blake3::hash(self.0.as_bytes()).to_hex().to_string();
        hex.truncate(KEY_FINGERPRINT_HEX);
        hex
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({})", self.fingerprint())
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
