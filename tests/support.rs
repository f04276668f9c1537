// tests/support.rs
//! Fixtures: seeded stores with legacy, migrated and backed-up entries

use journal_vault::db::records::store_key;
use journal_vault::db::{Filter, MemoryStore, RecordStore, Row, SqliteStore, Table};
use journal_vault::{CipherVersion, EncryptionKey};
use serde_json::{json, Value};
use tempfile::TempDir;

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture row must be an object, got {other}"),
    }
}

/// A legacy payload with the two required fields and a few extras
#[allow(dead_code)]
pub fn legacy_payload(title: &str, body: &str) -> Value {
    json!({
        "title": title,
        "body": body,
        "tags": ["daily"],
        "attachmentUris": [],
        "audioUri": null,
        "mood": "calm"
    })
}

#[allow(dead_code)]
pub fn seed_entry(store: &MemoryStore, id: &str, owner: &str, payload: Value) {
    store
        .insert(
            Table::Entries,
            row(json!({ "id": id, "owner_id": owner, "payload": payload })),
        )
        .expect("seed entry");
}

#[allow(dead_code)]
pub fn seed_backup(store: &MemoryStore, id: &str, owner: &str, payload: Value) {
    store
        .insert(
            Table::EntriesBackup,
            row(json!({ "id": id, "owner_id": owner, "payload": payload })),
        )
        .expect("seed backup");
}

/// Seed `count` legacy entries `{owner}-e{n}`, each with a matching snapshot
#[allow(dead_code)]
pub fn seed_backed_up(store: &MemoryStore, owner: &str, count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| {
            let id = format!("{owner}-e{n}");
            let payload = legacy_payload(&format!("Title {n}"), &format!("Body of entry {n}"));
            seed_entry(store, &id, owner, payload.clone());
            seed_backup(store, &id, owner, payload);
            id
        })
        .collect()
}

#[allow(dead_code)]
pub fn register_key(store: &dyn RecordStore, owner: &str, key: &str, version: CipherVersion) {
    store_key(store, owner, &EncryptionKey::new(key), version).expect("register key");
}

/// Current payload of entry `id`
#[allow(dead_code)]
pub fn payload_of(store: &dyn RecordStore, id: &str) -> Value {
    store
        .select(Table::Entries, &Filter::eq("id", id))
        .expect("select entry")
        .into_iter()
        .next()
        .and_then(|mut r| r.remove("payload"))
        .unwrap_or(Value::Null)
}

/// Registered key of `owner`, as stored
#[allow(dead_code)]
pub fn key_of(store: &dyn RecordStore, owner: &str) -> Option<String> {
    store
        .select(Table::UserKeys, &Filter::eq("user_id", owner))
        .expect("select key")
        .into_iter()
        .next()
        .and_then(|r| r.get("encryption_key").and_then(Value::as_str).map(str::to_string))
}

/// A fresh SQLite database file in its own temp directory
#[allow(dead_code)]
pub fn temp_sqlite() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::create(dir.path().join("journal.db")).expect("create db");
    (dir, store)
}
