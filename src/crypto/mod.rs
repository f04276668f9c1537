// src/crypto/mod.rs
//! Entry codecs: JSON value ⇄ ciphertext text
//!
//! Everything here works on in-memory values, no store access. The payload
//! is serialized to compact JSON and encrypted as one unit; `decrypt` picks the
//! codec from the envelope, so v1 and v2 entries can coexist under one key.

pub mod aes_gcm;
pub mod legacy;
mod verify;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::aliases::EncryptionKey;
use crate::consts::V2_ENVELOPE_PREFIX;
use crate::entry::SensitiveFields;
use crate::enums::CipherVersion;
use crate::error::{CodecError, CoreError};

pub use verify::verify;

/// Encrypt `plain` with the v1 keystream codec
pub fn encrypt<T: Serialize + ?Sized>(plain: &T, key: &EncryptionKey) -> Result<String, CodecError> {
    encrypt_versioned(CipherVersion::V1, plain, key)
}

/// Encrypt `plain` with an explicit codec version
pub fn encrypt_versioned<T: Serialize + ?Sized>(
    version: CipherVersion,
    plain: &T,
    key: &EncryptionKey,
) -> Result<String, CodecError> {
    let bytes = serde_json::to_vec(plain)?;
    match version {
        CipherVersion::V1 => legacy::encrypt_bytes(&bytes, key),
        CipherVersion::V2 => aes_gcm::seal(&bytes, key),
    }
}

/// Decrypt ciphertext of either version back into a value
pub fn decrypt<T: DeserializeOwned>(ciphertext: &str, key: &EncryptionKey) -> Result<T, CodecError> {
    let bytes = match detect_version(ciphertext) {
        CipherVersion::V1 => legacy::decrypt_bytes(ciphertext, key)?,
        CipherVersion::V2 => aes_gcm::open(ciphertext, key)?,
    };
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

/// Which codec produced `ciphertext`
pub fn detect_version(ciphertext: &str) -> CipherVersion {
    if ciphertext.trim_start().starts_with(V2_ENVELOPE_PREFIX) {
        CipherVersion::V2
    } else {
        CipherVersion::V1
    }
}

/// Round-trip a synthetic entry through the codec before touching real data
pub fn self_test(version: CipherVersion, key: &EncryptionKey) -> Result<(), CoreError> {
    let fixture = SensitiveFields {
        title: "self-test ✓".into(),
        body: "The quick brown fox jumps over the lazy dog.\n\"quoted\" \\ ünïcödé".into(),
        attachment_uris: vec!["file:///tmp/attachment.jpg".into()],
        tags: vec!["alpha".into(), "beta".into()],
        audio_uri: Some("file:///tmp/audio.m4a".into()),
        transcription: Some("spoken words".into()),
        derived_themes: Some(serde_json::json!(["calm", "focus"])),
        derived_sentiment: Some(serde_json::json!({ "score": 0.5 })),
        extra: [("mood".to_string(), serde_json::json!("calm"))]
            .into_iter()
            .collect(),
    };

    let ciphertext = encrypt_versioned(version, &fixture, key)
        .map_err(|e| CoreError::SelfTest(format!("{version} encrypt: {e}")))?;
    if detect_version(&ciphertext) != version {
        return Err(CoreError::SelfTest(format!(
            "{version} ciphertext not recognised as {version}"
        )));
    }
    let decoded: SensitiveFields = decrypt(&ciphertext, key)
        .map_err(|e| CoreError::SelfTest(format!("{version} decrypt: {e}")))?;
    if decoded != fixture {
        return Err(CoreError::SelfTest(format!(
            "{version} round trip altered the fixture"
        )));
    }
    Ok(())
}
