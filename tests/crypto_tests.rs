// tests/crypto_tests.rs
//! Codec behaviour: v1 keystream, v2 envelope, verification gate

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use journal_vault::crypto::{self, detect_version, self_test};
use journal_vault::{decrypt, encrypt, encrypt_versioned, verify};
use journal_vault::{CipherVersion, CodecError, EncryptionKey, SensitiveFields};
use serde_json::{json, Value};

fn fields(title: &str, body: &str) -> SensitiveFields {
    SensitiveFields {
        title: title.into(),
        body: body.into(),
        attachment_uris: vec!["file:///a.jpg".into()],
        tags: vec!["morning".into(), "café".into()],
        audio_uri: None,
        transcription: Some("spoken words".into()),
        derived_themes: Some(json!(["work", "family"])),
        derived_sentiment: Some(json!({ "score": 0.25 })),
        extra: Default::default(),
    }
}

#[test]
fn v1_round_trips_arbitrary_json() {
    common::setup();
    let key = EncryptionKey::new("aVeryLongKeyMadeOfLettersAndDigits0123456789");
    let samples = [
        json!({ "title": "Hi", "body": "World" }),
        json!([1, 2.5, null, true, "x"]),
        json!({ "nested": { "emoji": "🙂", "quote": "\"" } }),
        json!("just a string"),
        json!(42),
    ];
    for sample in samples {
        let ciphertext = encrypt(&sample, &key).unwrap();
        let decoded: Value = decrypt(&ciphertext, &key).unwrap();
        assert_eq!(decoded, sample);
    }
}

#[test]
fn single_character_key_scenario() {
    let plain = json!({ "title": "Hi", "body": "World" });
    let k = EncryptionKey::new("K");
    let j = EncryptionKey::new("J");

    let ciphertext = encrypt(&plain, &k).unwrap();
    let decoded_len = STANDARD.decode(&ciphertext).unwrap().len();
    assert_eq!(decoded_len, r#"{"title":"Hi","body":"World"}"#.len());

    let back: Value = decrypt(&ciphertext, &k).unwrap();
    assert_eq!(back, plain);

    let wrong = decrypt::<Value>(&ciphertext, &j);
    assert!(wrong.map_or(true, |v| v["title"] != "Hi"));
}

#[test]
fn empty_object_still_encrypts() {
    let key = EncryptionKey::new("K");
    let ciphertext = encrypt(&json!({}), &key).unwrap();
    assert_eq!(STANDARD.decode(&ciphertext).unwrap().len(), 2);
    let back: Value = decrypt(&ciphertext, &key).unwrap();
    assert_eq!(back, json!({}));
}

#[test]
fn empty_key_is_rejected_by_both_codecs() {
    let empty = EncryptionKey::new("");
    for version in [CipherVersion::V1, CipherVersion::V2] {
        let err = encrypt_versioned(version, &json!({ "a": 1 }), &empty).unwrap_err();
        assert!(matches!(err, CodecError::EmptyKey), "{version}: {err}");
    }
    let err = decrypt::<Value>("e30=", &empty).unwrap_err();
    assert!(matches!(err, CodecError::EmptyKey));
}

#[test]
fn malformed_base64_fails_to_decode() {
    let key = EncryptionKey::new("K");
    let err = decrypt::<Value>("not base64 !!", &key).unwrap_err();
    assert!(matches!(err, CodecError::Base64(_)));
}

#[test]
fn different_keys_do_not_reproduce_plaintext() {
    let original = fields("Dear diary", "Today was long.");
    let ciphertext = encrypt(&original, &EncryptionKey::new("first-key")).unwrap();
    let other = decrypt::<SensitiveFields>(&ciphertext, &EncryptionKey::new("other-key"));
    assert!(other.map_or(true, |f| f != original));
}

#[test]
fn v2_envelope_round_trips_and_authenticates() {
    let key = EncryptionKey::new("v2-key");
    let original = fields("Envelope", "Sealed with AES-GCM");

    let a = encrypt_versioned(CipherVersion::V2, &original, &key).unwrap();
    let b = encrypt_versioned(CipherVersion::V2, &original, &key).unwrap();
    assert!(a.starts_with("v2:"));
    assert_ne!(a, b, "nonces must differ between encryptions");
    assert_eq!(detect_version(&a), CipherVersion::V2);

    let back: SensitiveFields = decrypt(&a, &key).unwrap();
    assert_eq!(back, original);

    let err = decrypt::<SensitiveFields>(&a, &EncryptionKey::new("v2-kez")).unwrap_err();
    assert!(matches!(err, CodecError::Authentication));
}

#[test]
fn v2_rejects_tampered_and_truncated_envelopes() {
    let key = EncryptionKey::new("v2-key");
    let sealed = encrypt_versioned(CipherVersion::V2, &json!({ "a": 1 }), &key).unwrap();

    let mut raw = STANDARD.decode(&sealed[3..]).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;
    let tampered = format!("v2:{}", STANDARD.encode(&raw));
    assert!(decrypt::<Value>(&tampered, &key).is_err());

    let truncated = format!("v2:{}", STANDARD.encode(&raw[..8]));
    assert!(matches!(
        decrypt::<Value>(&truncated, &key),
        Err(CodecError::Envelope(_))
    ));
}

#[test]
fn v1_and_v2_coexist_under_one_key() {
    let key = EncryptionKey::new("shared");
    let old = encrypt(&json!({ "title": "old" }), &key).unwrap();
    let new = encrypt_versioned(CipherVersion::V2, &json!({ "title": "new" }), &key).unwrap();
    assert_eq!(detect_version(&old), CipherVersion::V1);
    assert_eq!(decrypt::<Value>(&old, &key).unwrap()["title"], "old");
    assert_eq!(decrypt::<Value>(&new, &key).unwrap()["title"], "new");
}

#[test]
fn verify_accepts_only_matching_ciphertext() {
    let key = EncryptionKey::new("verify-key");
    let original = fields("Same", "Same body");
    let ciphertext = encrypt(&original, &key).unwrap();

    assert!(verify(&original, &key, &ciphertext));
    assert!(!verify(&fields("Other", "Same body"), &key, &ciphertext));
    assert!(!verify(&original, &EncryptionKey::new("nope"), &ciphertext));
    assert!(!verify(&original, &key, "%%%garbage%%%"));
    assert!(!verify(&original, &EncryptionKey::new(""), &ciphertext));
}

#[test]
fn self_test_passes_for_both_versions() {
    let key = journal_vault::generate_key();
    self_test(CipherVersion::V1, &key).unwrap();
    self_test(CipherVersion::V2, &key).unwrap();
    assert!(crypto::self_test(CipherVersion::V1, &EncryptionKey::new("")).is_err());
}
