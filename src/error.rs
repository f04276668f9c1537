// src/error.rs
//! Public error types for the entire crate
//!
//! `CoreError` is fatal for an invocation. `RecordError` is scoped to one
//! entry and only ever ends up in a report.

use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("environment error: {0}")]
    Environment(String),

    #[error("cipher self-test failed: {0}")]
    SelfTest(String),

    #[error("could not persist encryption key for {owner}: {source}")]
    KeyPersistence {
        owner: String,
        #[source]
        source: StoreError,
    },

    #[error("{} entr(y/ies) for {owner} have no backup snapshot: {}", ids.len(), ids.join(", "))]
    MissingBackup { owner: String, ids: Vec<String> },

    #[error("entry {id}: {source}")]
    Record {
        id: String,
        #[source]
        source: RecordError,
    },

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(StoreError::Sql(err))
    }
}

/// Decode failures of the entry codecs
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("encryption key is empty")]
    EmptyKey,

    #[error("ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decrypted bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed ciphertext envelope: {0}")]
    Envelope(String),

    #[error("authenticated decryption failed")]
    Authentication,
}

/// Why a single entry could not be migrated, checked or restored
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("malformed entry: {0}")]
    Malformed(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no key registered for {0}")]
    MissingKey(String),

    #[error("round-trip verification failed")]
    Verification,

    #[error("store write failed: {0}")]
    Write(#[source] StoreError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
