// src/lib.rs
//! journal-vault: per-user encryption of journal entries at rest
//!
//! Features:
//! - Migration of plaintext entries to per-user ciphertext, one user at a time
//! - Legacy keystream codec (v1) and AES-256-GCM envelope (v2)
//! - Backup snapshots and rollback
//! - Generic record store contract with SQLite and in-memory adapters
//! - Log relay and transcription proxy endpoints

pub mod aliases;
pub mod check;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod db;
pub mod entry;
pub mod enums;
pub mod error;
pub mod http;
pub mod key_ops;
pub mod key_provider;
pub mod logging;
pub mod migrate;
pub mod report;
pub mod rollback;

// Re-export everything users need at the crate root
pub use aliases::EncryptionKey;
pub use check::{check_principal, open_entry};
pub use config::load as load_config;
pub use crypto::{decrypt, encrypt, encrypt_versioned, verify};
pub use db::{MemoryStore, PrincipalDirectory, RecordStore, SqliteStore, Table};
pub use entry::{PayloadState, SensitiveFields};
pub use enums::{CipherVersion, EntryStatus};
pub use error::{CodecError, CoreError, RecordError, Result as CoreResult};
pub use key_ops::generate_key;
pub use key_provider::{ActiveKey, KeyProvider, StoreKeyProvider};
pub use migrate::{migrate_all, migrate_principal, MigrationOptions, Migrator};
pub use report::{CheckReport, Failure, RollbackReport, RunReport};
pub use rollback::{rollback, rollback_principal, snapshot_principal};
