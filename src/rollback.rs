// src/rollback.rs
//! Backup snapshots and the compensating restore path
//!
//! Rollback is an operator action, never triggered by a failed migration.
//! It overwrites every entry that has a snapshot with the snapshot payload,
//! without verification, then retires the user's key.

use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::db::records::{backups_for, delete_key, entries_for, from_row, now_timestamp, write_payload};
use crate::db::{decode_error, row_label, BackupSnapshot, Entry, RecordStore, Row, Table};
use crate::entry::PayloadState;
use crate::error::{RecordError, Result};
use crate::key_provider::{KeyProvider, StoreKeyProvider};
use crate::report::RollbackReport;

/// Copy every legacy entry of `owner` that has no snapshot yet
///
/// Existing snapshots are never overwritten; a snapshot taken after an entry
/// was migrated would restore ciphertext. Returns how many were written.
pub fn snapshot_principal(store: &dyn RecordStore, owner: &str) -> Result<usize> {
    let existing: HashSet<String> = backups_for(store, owner)?
        .iter()
        .map(|row| row_label(Table::EntriesBackup, row))
        .collect();

    let mut written = 0;
    for row in entries_for(store, owner)? {
        if let Some(reason) = decode_error(&row) {
            let id = row_label(Table::Entries, &row);
            warn!(owner, entry_id = %id, %reason, "skipping undecodable entry while snapshotting");
            continue;
        }
        let entry: Entry = match from_row(Table::Entries, row) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(owner, error = %err, "skipping unreadable entry while snapshotting");
                continue;
            }
        };
        if existing.contains(&entry.id) || !matches!(entry.state(), PayloadState::Legacy(_)) {
            continue;
        }
        let snapshot = json!({
            "id": entry.id,
            "owner_id": entry.owner_id,
            "payload": entry.payload,
            "created_at": now_timestamp(),
        });
        if let Value::Object(row) = snapshot {
            store.upsert(Table::EntriesBackup, row)?;
            written += 1;
        }
    }
    Ok(written)
}

fn restore(store: &dyn RecordStore, row: Row) -> std::result::Result<String, (String, RecordError)> {
    let label = row_label(Table::EntriesBackup, &row);
    if let Some(reason) = decode_error(&row) {
        return Err((label, RecordError::Malformed(reason.to_string())));
    }
    let BackupSnapshot { id, payload, .. } = from_row(Table::EntriesBackup, row)
        .map_err(|e| (label, RecordError::Malformed(e.to_string())))?;
    let status = match PayloadState::classify(&payload, None) {
        PayloadState::Malformed(reason) => {
            return Err((id, RecordError::Malformed(format!("snapshot not restorable: {reason}"))))
        }
        state => state.status(),
    };
    match write_payload(store, &id, payload, status) {
        Ok(()) => Ok(id),
        Err(err) => Err((id, RecordError::Write(err))),
    }
}

/// Restore `owner` from snapshots, then delete the key
///
/// Each restore is isolated. The key is only deleted when every restore
/// succeeded: entries left encrypted would be unreadable without it.
pub fn rollback_principal(
    store: &dyn RecordStore,
    keys: &dyn KeyProvider,
    owner: &str,
) -> Result<RollbackReport> {
    let mut report = RollbackReport::new(owner);
    let snapshots = backups_for(store, owner)?;
    if snapshots.is_empty() {
        info!(owner, "no backup snapshots, nothing to roll back");
        report.key_note = Some("no snapshots found".into());
        return Ok(report);
    }

    for row in snapshots {
        match restore(store, row) {
            Ok(id) => {
                info!(owner, entry_id = %id, outcome = "restored");
                report.restored += 1;
            }
            Err((id, err)) => {
                warn!(owner, entry_id = %id, outcome = "failed", error = %err);
                report.record_failure(&id, err);
            }
        }
    }

    if report.failed > 0 {
        report.key_note = Some(format!(
            "{} entr(y/ies) not restored, key still needed",
            report.failed
        ));
    } else {
        match delete_key(store, owner) {
            Ok(_) => report.key_deleted = true,
            Err(err) => {
                error!(owner, error = %err, "restored all entries but could not delete key");
                report.key_note = Some(format!("delete failed: {err}"));
            }
        }
    }
    keys.invalidate(owner);

    info!(
        owner,
        restored = report.restored,
        failed = report.failed,
        key_deleted = report.key_deleted,
        "rollback finished"
    );
    Ok(report)
}

/// Roll back one principal, reading keys straight from `store`
pub fn rollback(store: &dyn RecordStore, owner: &str) -> Result<RollbackReport> {
    let keys = StoreKeyProvider::new(store);
    rollback_principal(store, &keys, owner)
}
