// tests/migration_tests.rs
//! Migration engine against the in-memory store

mod common;
mod support;

use journal_vault::db::{Filter, MemoryStore, RecordStore, Table};
use journal_vault::{
    decrypt, migrate_all, migrate_principal, CipherVersion, CoreError, EncryptionKey,
    MigrationOptions, SensitiveFields,
};
use serde_json::{json, Value};
use support::{
    key_of, legacy_payload, payload_of, register_key, seed_backed_up, seed_backup, seed_entry,
};

fn options() -> MigrationOptions {
    MigrationOptions::default()
}

fn decrypt_entry(store: &MemoryStore, owner: &str, id: &str) -> SensitiveFields {
    let key = EncryptionKey::new(key_of(store, owner).expect("key registered"));
    let payload = payload_of(store, id);
    let ciphertext = payload.as_str().expect("migrated payload is a string");
    decrypt(ciphertext, &key).expect("decrypts with the registered key")
}

#[test]
fn principal_without_entries_is_a_noop() {
    common::setup();
    let store = MemoryStore::new();
    let report = migrate_principal(&store, "ghost", options()).unwrap();
    assert_eq!(report.total(), 0);
    assert!(report.is_clean());
    assert!(key_of(&store, "ghost").is_none());
}

#[test]
fn legacy_entries_become_ciphertext_under_a_new_key() {
    common::setup();
    let store = MemoryStore::new();
    let ids = seed_backed_up(&store, "u1", 3);

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!((report.succeeded, report.skipped, report.failed), (3, 0, 0));
    assert_eq!(report.cipher_version, Some(CipherVersion::V1));

    let key = key_of(&store, "u1").expect("key persisted");
    assert_eq!(key.len(), 64);
    assert_eq!(
        report.key_fingerprint,
        Some(EncryptionKey::new(key).fingerprint())
    );

    for (n, id) in ids.iter().enumerate() {
        let fields = decrypt_entry(&store, "u1", id);
        assert_eq!(fields.title, format!("Title {}", n + 1));
        assert_eq!(fields.tags, vec!["daily".to_string()]);
    }

    let statuses: Vec<Value> = store
        .rows(Table::Entries)
        .into_iter()
        .map(|r| r["status"].clone())
        .collect();
    assert!(statuses.iter().all(|s| s == "migrated"));
}

#[test]
fn second_run_skips_everything_and_keeps_the_key() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 4);

    let first = migrate_principal(&store, "u1", options()).unwrap();
    let key_after_first = key_of(&store, "u1");
    let rows_after_first = store.rows(Table::Entries);

    let second = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, first.succeeded);
    assert_eq!(key_of(&store, "u1"), key_after_first);
    assert_eq!(store.rows(Table::Entries), rows_after_first);
}

#[test]
fn malformed_entry_is_isolated() {
    common::setup();
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 4);
    let broken = json!({ "body": "no title here" });
    seed_entry(&store, "u1-bad", "u1", broken.clone());
    seed_backup(&store, "u1-bad", "u1", broken.clone());

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_ids(), vec!["u1-bad"]);
    assert_eq!(payload_of(&store, "u1-bad"), broken);
    assert!(report.to_string().contains("u1-bad"));
}

#[test]
fn already_migrated_entry_is_untouched_byte_for_byte() {
    let store = MemoryStore::new();
    register_key(&store, "u1", "ExistingKey", CipherVersion::V1);
    seed_entry(&store, "u1-old", "u1", json!("b3BhcXVlLWNpcGhlcnRleHQ="));
    seed_backed_up(&store, "u1", 1);
    let before = store
        .select(Table::Entries, &Filter::eq("id", "u1-old"))
        .unwrap();

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 1);
    let after = store
        .select(Table::Entries, &Filter::eq("id", "u1-old"))
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn contradicting_status_counts_as_failure() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 1);
    store
        .insert(
            Table::Entries,
            support::row(json!({
                "id": "u1-odd",
                "owner_id": "u1",
                "payload": legacy_payload("T", "B"),
                "status": "migrated"
            })),
        )
        .unwrap();

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed_ids(), vec!["u1-odd"]);
}

#[test]
fn failed_update_leaves_entry_legacy_and_run_continues() {
    let store = MemoryStore::new();
    let ids = seed_backed_up(&store, "u1", 3);
    store.fail_updates_for(ids[1].clone());

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed_ids(), vec![ids[1].as_str()]);
    assert!(payload_of(&store, &ids[1]).is_object());
    assert!(payload_of(&store, &ids[2]).is_string());
}

#[test]
fn key_persistence_failure_aborts_before_any_entry() {
    let store = MemoryStore::new();
    let ids = seed_backed_up(&store, "u1", 2);
    store.fail_upserts(true);

    let err = migrate_principal(&store, "u1", options()).unwrap_err();
    assert!(matches!(err, CoreError::KeyPersistence { ref owner, .. } if owner == "u1"));
    for id in &ids {
        assert!(payload_of(&store, id).is_object());
    }
}

#[test]
fn missing_backup_is_fatal_and_nothing_changes() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 1);
    seed_entry(&store, "u1-nobackup", "u1", legacy_payload("x", "y"));

    let err = migrate_principal(&store, "u1", options()).unwrap_err();
    match err {
        CoreError::MissingBackup { owner, ids } => {
            assert_eq!(owner, "u1");
            assert_eq!(ids, vec!["u1-nobackup".to_string()]);
        }
        other => panic!("expected MissingBackup, got {other}"),
    }
    assert!(key_of(&store, "u1").is_none());
    assert!(store
        .rows(Table::Entries)
        .iter()
        .all(|r| r["payload"].is_object()));
}

#[test]
fn backups_can_be_waived_or_created() {
    let store = MemoryStore::new();
    seed_entry(&store, "a1", "a", legacy_payload("A", "a"));
    let waived = MigrationOptions {
        require_backup: false,
        ..options()
    };
    assert_eq!(migrate_principal(&store, "a", waived).unwrap().succeeded, 1);
    assert!(store.rows(Table::EntriesBackup).is_empty());

    seed_entry(&store, "b1", "b", legacy_payload("B", "b"));
    seed_entry(&store, "b2", "b", legacy_payload("B2", "b2"));
    let creating = MigrationOptions {
        create_backups: true,
        ..options()
    };
    let report = migrate_principal(&store, "b", creating).unwrap();
    assert_eq!(report.succeeded, 2);
    let backups = store.rows(Table::EntriesBackup);
    assert_eq!(backups.len(), 2);
    assert_eq!(backups[0]["payload"], legacy_payload("B", "b"));
}

#[test]
fn registered_key_and_version_are_reused() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 2);
    register_key(&store, "u1", "PreviouslyIssuedKey", CipherVersion::V2);

    let report = migrate_principal(&store, "u1", options()).unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.cipher_version, Some(CipherVersion::V2));
    assert_eq!(key_of(&store, "u1").as_deref(), Some("PreviouslyIssuedKey"));
    assert!(payload_of(&store, "u1-e1")
        .as_str()
        .is_some_and(|p| p.starts_with("v2:")));
    assert_eq!(decrypt_entry(&store, "u1", "u1-e2").title, "Title 2");
}

#[test]
fn v2_option_applies_to_new_users() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u2", 1);
    let v2 = MigrationOptions {
        cipher_version: CipherVersion::V2,
        ..options()
    };
    migrate_principal(&store, "u2", v2).unwrap();
    let row = store
        .select(Table::UserKeys, &Filter::eq("user_id", "u2"))
        .unwrap()
        .remove(0);
    assert_eq!(row["cipher_version"], 2);
    assert_eq!(decrypt_entry(&store, "u2", "u2-e1").body, "Body of entry 1");
}

#[test]
fn unknown_payload_keys_are_encrypted_with_the_rest() {
    let store = MemoryStore::new();
    seed_entry(
        &store,
        "u1-rich",
        "u1",
        json!({
            "title": "Walk",
            "body": "Went to the harbour",
            "mood": "calm",
            "location": { "lat": 59.9, "lon": 10.7 },
            "weather": null
        }),
    );
    let waived = MigrationOptions {
        require_backup: false,
        ..options()
    };

    let report = migrate_principal(&store, "u1", waived).unwrap();
    assert_eq!(report.succeeded, 1);

    let stored = payload_of(&store, "u1-rich");
    let ciphertext = stored.as_str().expect("payload replaced by ciphertext");
    assert!(!ciphertext.contains("harbour"));

    let fields = decrypt_entry(&store, "u1", "u1-rich");
    assert_eq!(fields.extra.get("mood"), Some(&json!("calm")));
    assert_eq!(
        fields.extra.get("location"),
        Some(&json!({ "lat": 59.9, "lon": 10.7 }))
    );
    assert_eq!(fields.extra.get("weather"), Some(&Value::Null));
}

#[test]
fn failing_self_test_aborts_before_any_write() {
    let store = MemoryStore::new();
    seed_backed_up(&store, "u1", 2);
    register_key(&store, "u1", "", CipherVersion::V1);
    let entries_before = store.rows(Table::Entries);
    let keys_before = store.rows(Table::UserKeys);

    let err = migrate_principal(&store, "u1", options()).unwrap_err();
    assert!(matches!(err, CoreError::SelfTest(_)), "got {err}");
    assert_eq!(store.rows(Table::Entries), entries_before);
    assert_eq!(store.rows(Table::UserKeys), keys_before);
}

#[test]
fn all_users_run_reports_in_directory_order() {
    common::setup();
    let store = MemoryStore::new();
    seed_backed_up(&store, "alice", 3);
    seed_backed_up(&store, "bob", 2);
    seed_entry(&store, "carol-e1", "carol", legacy_payload("C", "c"));
    seed_backed_up(&store, "dave", 1);

    let pool = MigrationOptions {
        workers: 3,
        ..options()
    };
    let reports = migrate_all(&store, &store, pool).unwrap();
    let owners: Vec<&str> = reports.iter().map(|r| r.owner.as_str()).collect();
    assert_eq!(owners, vec!["alice", "bob", "carol", "dave"]);

    assert_eq!(reports[0].succeeded, 3);
    assert_eq!(reports[1].succeeded, 2);
    assert!(reports[2].aborted.is_some(), "carol has no backup");
    assert_eq!(reports[3].succeeded, 1);

    let keys = store.rows(Table::UserKeys);
    assert_eq!(keys.len(), 3);
    assert!(payload_of(&store, "carol-e1").is_object());
}

#[test]
fn all_users_run_on_empty_store() {
    let store = MemoryStore::new();
    assert!(migrate_all(&store, &store, options()).unwrap().is_empty());
}
