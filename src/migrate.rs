// src/migrate.rs
//! Per-user migration of legacy entries to ciphertext
//!
//! Order of events for one principal:
//! 1. classify every entry (legacy / migrated / malformed), nothing written
//! 2. resolve the key: reuse the registered one, else generate a fresh one
//! 3. codec self-test with that key
//! 4. backup precondition (optionally creating the snapshots first)
//! 5. persist a freshly generated key
//! 6. encrypt → verify → write each legacy entry, one at a time
//!
//! Steps 2–5 are fatal on failure. Step 6 failures are recorded per entry and
//! the loop carries on. Already-migrated entries are skipped untouched, so
//! re-running converges.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{error, info, info_span, warn};

use crate::config::MigrationConfig;
use crate::crypto::{self, verify};
use crate::db::records::{backups_for, entries_for, from_row, store_key, write_payload};
use crate::db::{decode_error, row_label, Entry, PrincipalDirectory, RecordStore, Row, Table};
use crate::entry::{PayloadState, SensitiveFields};
use crate::enums::{CipherVersion, EntryStatus};
use crate::error::{CoreError, RecordError, Result};
use crate::key_ops::generate_key_for;
use crate::key_provider::{ActiveKey, KeyProvider, StoreKeyProvider};
use crate::report::RunReport;
use crate::rollback::snapshot_principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Codec for users that have no key yet
    pub cipher_version: CipherVersion,
    pub require_backup: bool,
    pub create_backups: bool,
    /// Worker threads for [`migrate_all`]
    pub workers: usize,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            cipher_version: CipherVersion::V1,
            require_backup: true,
            create_backups: false,
            workers: 1,
        }
    }
}

impl From<&MigrationConfig> for MigrationOptions {
    fn from(conf: &MigrationConfig) -> Self {
        Self {
            cipher_version: conf.cipher_version,
            require_backup: conf.require_backup,
            create_backups: conf.create_backups,
            workers: conf.workers,
        }
    }
}

/// An entry row after classification
enum Planned {
    Legacy { id: String, payload: Map<String, Value> },
    Migrated,
    Malformed { id: String, reason: String },
}

fn plan(row: Row) -> Planned {
    let id = row_label(Table::Entries, &row);
    if let Some(reason) = decode_error(&row) {
        return Planned::Malformed {
            id,
            reason: reason.to_string(),
        };
    }
    let entry: Entry = match from_row(Table::Entries, row) {
        Ok(entry) => entry,
        Err(err) => {
            return Planned::Malformed {
                id,
                reason: err.to_string(),
            }
        }
    };
    match entry.state() {
        PayloadState::Legacy(map) => Planned::Legacy {
            id,
            payload: map.clone(),
        },
        PayloadState::Migrated(_) => Planned::Migrated,
        PayloadState::Malformed(reason) => Planned::Malformed {
            id,
            reason: reason.to_string(),
        },
    }
}

/// Drives migrations against one store and one key provider
pub struct Migrator<'a> {
    store: &'a dyn RecordStore,
    keys: &'a dyn KeyProvider,
    options: MigrationOptions,
}

impl<'a> Migrator<'a> {
    pub fn new(store: &'a dyn RecordStore, keys: &'a dyn KeyProvider, options: MigrationOptions) -> Self {
        Self {
            store,
            keys,
            options,
        }
    }

    /// Migrate every legacy entry of `owner`
    pub fn migrate_principal(&self, owner: &str) -> Result<RunReport> {
        let mut report = RunReport::new(owner);

        let rows = entries_for(self.store, owner)?;
        if rows.is_empty() {
            info!(owner, "no entries, nothing to migrate");
            return Ok(report);
        }
        let planned: Vec<Planned> = rows.into_iter().map(plan).collect();
        let legacy_ids: Vec<&str> = planned
            .iter()
            .filter_map(|p| match p {
                Planned::Legacy { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();

        if legacy_ids.is_empty() {
            info!(owner, "no legacy entries left");
            tally_without_key(&mut report, &planned);
            return Ok(report);
        }

        let (active, is_new) = self.resolve_key(owner)?;
        crypto::self_test(active.version, &active.key)?;
        self.check_backups(owner, &legacy_ids)?;
        if is_new {
            store_key(self.store, owner, &active.key, active.version).map_err(|source| {
                CoreError::KeyPersistence {
                    owner: owner.to_string(),
                    source,
                }
            })?;
            self.keys.invalidate(owner);
        }

        report.key_fingerprint = Some(active.key.fingerprint());
        report.cipher_version = Some(active.version);
        info!(
            owner,
            entries = planned.len(),
            legacy = legacy_ids.len(),
            fingerprint = %active.key.fingerprint(),
            version = %active.version,
            new_key = is_new,
            "migrating"
        );

        for item in planned {
            match item {
                Planned::Migrated => report.record_skip(),
                Planned::Malformed { id, reason } => {
                    warn!(owner, entry_id = %id, %reason, "malformed entry");
                    report.record_failure(&id, RecordError::Malformed(reason));
                }
                Planned::Legacy { id, payload } => {
                    match self.migrate_entry(&id, &payload, &active) {
                        Ok(()) => {
                            info!(owner, entry_id = %id, outcome = "succeeded");
                            report.record_success();
                        }
                        Err(err) => {
                            warn!(owner, entry_id = %id, outcome = "failed", error = %err);
                            report.record_failure(&id, err);
                        }
                    }
                }
            }
        }

        info!(
            owner,
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            "migration finished"
        );
        Ok(report)
    }

    /// Existing key if registered, otherwise a fresh one (not yet persisted)
    fn resolve_key(&self, owner: &str) -> Result<(ActiveKey, bool)> {
        if let Some(active) = self.keys.key_for(owner)? {
            return Ok((active, false));
        }
        let version = self.options.cipher_version;
        let active = ActiveKey {
            key: generate_key_for(version),
            version,
        };
        Ok((active, true))
    }

    fn check_backups(&self, owner: &str, legacy_ids: &[&str]) -> Result<()> {
        if self.options.create_backups {
            let created = snapshot_principal(self.store, owner)?;
            info!(owner, created, "backup snapshots written");
        }
        if !self.options.require_backup {
            return Ok(());
        }
        // an undecodable snapshot cannot be restored, so it does not count
        let backed_up: HashSet<String> = backups_for(self.store, owner)?
            .iter()
            .filter(|row| decode_error(row).is_none())
            .map(|row| row_label(Table::EntriesBackup, row))
            .collect();
        let missing: Vec<String> = legacy_ids
            .iter()
            .filter(|id| !backed_up.contains(**id))
            .map(|id| id.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingBackup {
                owner: owner.to_string(),
                ids: missing,
            })
        }
    }

    fn migrate_entry(
        &self,
        id: &str,
        payload: &Map<String, Value>,
        active: &ActiveKey,
    ) -> std::result::Result<(), RecordError> {
        let fields = SensitiveFields::extract(payload)?;
        let ciphertext = encrypt_fields(&fields, active)?;
        if !verify(&fields, &active.key, &ciphertext) {
            return Err(RecordError::Verification);
        }
        write_payload(
            self.store,
            id,
            Value::String(ciphertext),
            Some(EntryStatus::Migrated),
        )
        .map_err(RecordError::Write)
    }
}

fn encrypt_fields(
    fields: &SensitiveFields,
    active: &ActiveKey,
) -> std::result::Result<String, RecordError> {
    Ok(crypto::encrypt_versioned(active.version, fields, &active.key)?)
}

fn tally_without_key(report: &mut RunReport, planned: &[Planned]) {
    for item in planned {
        match item {
            Planned::Migrated => report.record_skip(),
            Planned::Malformed { id, reason } => {
                report.record_failure(id, RecordError::Malformed(reason.clone()))
            }
            Planned::Legacy { .. } => {}
        }
    }
}

/// Migrate one principal, reading keys straight from `store`
pub fn migrate_principal(
    store: &dyn RecordStore,
    owner: &str,
    options: MigrationOptions,
) -> Result<RunReport> {
    let keys = StoreKeyProvider::new(store);
    Migrator::new(store, &keys, options).migrate_principal(owner)
}

/// Migrate every principal the directory knows about
///
/// Principals are spread over `options.workers` threads; each principal's
/// entries are still processed sequentially by a single worker. A fatal
/// error for one principal lands in its report and the others carry on.
/// Reports come back in directory order.
pub fn migrate_all(
    store: &dyn RecordStore,
    directory: &dyn PrincipalDirectory,
    options: MigrationOptions,
) -> Result<Vec<RunReport>> {
    let principals = directory.list_principals()?;
    if principals.is_empty() {
        return Ok(Vec::new());
    }

    let keys = StoreKeyProvider::new(store);
    let migrator = Migrator::new(store, &keys, options);
    let cursor = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<RunReport>>> = Mutex::new(vec![None; principals.len()]);
    let workers = options.workers.clamp(1, principals.len());

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let (migrator, cursor, slots, principals) = (&migrator, &cursor, &slots, &principals);
            scope.spawn(move || loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(owner) = principals.get(index) else {
                    break;
                };
                let _span = info_span!("principal", worker, owner = %owner).entered();
                let report = match migrator.migrate_principal(owner) {
                    Ok(report) => report,
                    Err(err) => {
                        error!(owner = %owner, error = %err, "migration aborted");
                        RunReport::aborted(owner.as_str(), &err)
                    }
                };
                if let Ok(mut slots) = slots.lock() {
                    slots[index] = Some(report);
                }
            });
        }
    });

    let slots = slots
        .into_inner()
        .map_err(|_| CoreError::Environment("worker pool state poisoned".into()))?;
    Ok(slots
        .into_iter()
        .zip(principals)
        .map(|(slot, owner)| {
            slot.unwrap_or_else(|| RunReport::aborted(owner, "worker did not report"))
        })
        .collect())
}
