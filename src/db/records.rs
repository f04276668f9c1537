// src/db/records.rs
//! Typed views over raw rows, plus the handful of typed queries the engine uses

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aliases::EncryptionKey;
use crate::db::store::{Filter, RecordStore, Row, StoreError, Table};
use crate::entry::PayloadState;
use crate::enums::{CipherVersion, EntryStatus};

/// A journal entry row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub owner_id: String,
    pub payload: Value,
    #[serde(default)]
    pub status: Option<EntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entry {
    pub fn state(&self) -> PayloadState<'_> {
        PayloadState::classify(&self.payload, self.status)
    }
}

/// Pre-migration copy of an entry payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub id: String,
    pub owner_id: String,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Registry row: one key per user
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub user_id: String,
    pub encryption_key: String,
    #[serde(default)]
    pub cipher_version: CipherVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl KeyRecord {
    pub fn key(&self) -> EncryptionKey {
        EncryptionKey::new(self.encryption_key.clone())
    }
}

/// Decode a raw row into one of the typed views
pub fn from_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::InvalidRow {
        table,
        reason: e.to_string(),
    })
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Raw entry rows of `owner`, in store order
pub fn entries_for(store: &dyn RecordStore, owner: &str) -> Result<Vec<Row>, StoreError> {
    store.select(Table::Entries, &Filter::eq("owner_id", owner))
}

/// Raw backup rows of `owner`, in store order
pub fn backups_for(store: &dyn RecordStore, owner: &str) -> Result<Vec<Row>, StoreError> {
    store.select(Table::EntriesBackup, &Filter::eq("owner_id", owner))
}

/// Replace an entry's payload and stamp its explicit status
pub fn write_payload(
    store: &dyn RecordStore,
    id: &str,
    payload: Value,
    status: Option<EntryStatus>,
) -> Result<(), StoreError> {
    let fields = object(json!({
        "payload": payload,
        "status": status,
        "updated_at": now_timestamp(),
    }));
    store.update(Table::Entries, id, fields)
}

/// Registered key of `owner`, if any
pub fn load_key(store: &dyn RecordStore, owner: &str) -> Result<Option<KeyRecord>, StoreError> {
    store
        .select(Table::UserKeys, &Filter::eq("user_id", owner))?
        .into_iter()
        .next()
        .map(|row| from_row(Table::UserKeys, row))
        .transpose()
}

/// Insert or overwrite the key of `owner`
pub fn store_key(
    store: &dyn RecordStore,
    owner: &str,
    key: &EncryptionKey,
    version: CipherVersion,
) -> Result<(), StoreError> {
    let row = object(json!({
        "user_id": owner,
        "encryption_key": key.expose_secret(),
        "cipher_version": version.as_u8(),
        "created_at": now_timestamp(),
    }));
    store.upsert(Table::UserKeys, row)
}

pub fn delete_key(store: &dyn RecordStore, owner: &str) -> Result<usize, StoreError> {
    store.delete(Table::UserKeys, &Filter::eq("user_id", owner))
}
