// src/check.rs
//! Read-only decrypt check of a user's entries

use tracing::{info, warn};

use crate::crypto::decrypt;
use crate::db::records::{entries_for, from_row};
use crate::db::{decode_error, row_label, Entry, Filter, RecordStore, StoreError, Table};
use crate::entry::{PayloadState, SensitiveFields};
use crate::error::{CoreError, RecordError, Result};
use crate::key_provider::KeyProvider;
use crate::report::CheckReport;

/// Decrypt every migrated entry of `owner` with its registered key
///
/// Never writes. Legacy entries are counted, not touched.
pub fn check_principal(
    store: &dyn RecordStore,
    keys: &dyn KeyProvider,
    owner: &str,
) -> Result<CheckReport> {
    let mut report = CheckReport::new(owner);
    let active = keys.key_for(owner)?;
    report.key_present = active.is_some();

    for row in entries_for(store, owner)? {
        let id = row_label(Table::Entries, &row);
        if let Some(reason) = decode_error(&row) {
            report.record_failure(&id, RecordError::Malformed(reason.to_string()));
            continue;
        }
        let entry: Entry = match from_row(Table::Entries, row) {
            Ok(entry) => entry,
            Err(err) => {
                report.record_failure(&id, err);
                continue;
            }
        };
        match (entry.state(), &active) {
            (PayloadState::Legacy(_), _) => report.legacy += 1,
            (PayloadState::Malformed(reason), _) => report.record_failure(&entry.id, reason),
            (PayloadState::Migrated(_), None) => {
                report.record_failure(&entry.id, RecordError::MissingKey(owner.to_string()))
            }
            (PayloadState::Migrated(ciphertext), Some(active)) => {
                match decrypt::<SensitiveFields>(ciphertext, &active.key) {
                    Ok(_) => report.verified += 1,
                    Err(err) => {
                        warn!(owner, entry_id = %entry.id, error = %err, "entry does not decrypt");
                        report.record_failure(&entry.id, RecordError::Codec(err));
                    }
                }
            }
        }
    }

    info!(
        owner,
        verified = report.verified,
        legacy = report.legacy,
        failed = report.failed,
        "check finished"
    );
    Ok(report)
}

/// Decrypt a single entry for display; legacy entries come back as-is
pub fn open_entry(
    store: &dyn RecordStore,
    keys: &dyn KeyProvider,
    id: &str,
) -> Result<SensitiveFields> {
    let row = store
        .select(Table::Entries, &Filter::eq("id", id))?
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound {
            table: Table::Entries,
            id: id.to_string(),
        })?;
    if let Some(reason) = decode_error(&row) {
        return Err(CoreError::Record {
            id: id.to_string(),
            source: RecordError::Malformed(reason.to_string()),
        });
    }
    let entry: Entry = from_row(Table::Entries, row)?;
    let opened = match entry.state() {
        PayloadState::Legacy(map) => SensitiveFields::extract(map),
        PayloadState::Migrated(ciphertext) => match keys.key_for(&entry.owner_id)? {
            Some(active) => decrypt(ciphertext, &active.key).map_err(RecordError::from),
            None => Err(RecordError::MissingKey(entry.owner_id.clone())),
        },
        PayloadState::Malformed(reason) => Err(RecordError::Malformed(reason.to_string())),
    };
    opened.map_err(|source| CoreError::Record {
        id: id.to_string(),
        source,
    })
}
