// src/entry.rs
//! Journal entry payloads and their migration state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::EntryStatus;
use crate::error::RecordError;

/// Payload keys with a typed slot in [`SensitiveFields`]
const KNOWN_KEYS: &[&str] = &[
    "title",
    "body",
    "attachmentUris",
    "tags",
    "audioUri",
    "transcription",
    "derivedThemes",
    "derivedSentiment",
];

/// Everything in a legacy payload that gets encrypted
///
/// Keys without a typed slot ride along in `extra`, so the ciphertext always
/// holds the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveFields {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub attachment_uris: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_themes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_sentiment: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SensitiveFields {
    /// Read a legacy payload object
    ///
    /// Typed optional fields may be missing or null; `title` and `body` must be
    /// strings. Any other key is kept verbatim in `extra`, nulls included.
    pub fn extract(payload: &Map<String, Value>) -> Result<Self, RecordError> {
        let mut subset = Map::new();
        for (name, value) in payload {
            if value.is_null() && KNOWN_KEYS.contains(&name.as_str()) {
                continue;
            }
            subset.insert(name.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(subset))
            .map_err(|e| RecordError::Malformed(e.to_string()))
    }
}

/// How an entry payload looks right now
///
/// Shape decides for rows written before the explicit status column existed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadState<'a> {
    Legacy(&'a Map<String, Value>),
    Migrated(&'a str),
    Malformed(&'static str),
}

impl<'a> PayloadState<'a> {
    pub fn classify(payload: &'a Value, status: Option<EntryStatus>) -> Self {
        match (payload, status) {
            (Value::Object(map), None | Some(EntryStatus::Legacy)) => PayloadState::Legacy(map),
            (Value::String(text), None | Some(EntryStatus::Migrated)) => {
                PayloadState::Migrated(text.as_str())
            }
            (Value::Object(_), Some(EntryStatus::Migrated)) => {
                PayloadState::Malformed("status says migrated but payload is an object")
            }
            (Value::String(_), Some(EntryStatus::Legacy)) => {
                PayloadState::Malformed("status says legacy but payload is a string")
            }
            _ => PayloadState::Malformed("payload is neither an object nor a string"),
        }
    }

    /// Status to write next to this payload
    pub fn status(&self) -> Option<EntryStatus> {
        match self {
            PayloadState::Legacy(_) => Some(EntryStatus::Legacy),
            PayloadState::Migrated(_) => Some(EntryStatus::Migrated),
            PayloadState::Malformed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_tolerates_missing_and_null_optionals() {
        let payload = json!({
            "title": "Hi",
            "body": "World",
            "audioUri": null,
            "mood": "ok"
        });
        let fields = SensitiveFields::extract(payload.as_object().unwrap()).unwrap();
        assert_eq!(fields.title, "Hi");
        assert!(fields.tags.is_empty());
        assert!(fields.audio_uri.is_none());
        assert_eq!(fields.extra.get("mood"), Some(&json!("ok")));
        assert!(!fields.extra.contains_key("audioUri"));
    }

    #[test]
    fn extract_rejects_missing_title() {
        let payload = json!({ "body": "no title" });
        assert!(matches!(
            SensitiveFields::extract(payload.as_object().unwrap()),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn status_contradicting_shape_is_malformed() {
        let payload = json!({ "title": "t", "body": "b" });
        assert!(matches!(
            PayloadState::classify(&payload, Some(EntryStatus::Migrated)),
            PayloadState::Malformed(_)
        ));
        let cipher = json!("abc=");
        assert!(matches!(
            PayloadState::classify(&cipher, None),
            PayloadState::Migrated("abc=")
        ));
    }
}
