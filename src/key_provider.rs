// src/key_provider.rs
//! Where the engine gets a user's existing key from
//!
//! Keys are loaded on demand and cached per provider instance; nothing is
//! held in process-wide state. Writers call `invalidate` after changing the
//! registry so the next lookup goes back to the store.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::aliases::EncryptionKey;
use crate::db::records::load_key;
use crate::db::{RecordStore, StoreError};
use crate::enums::CipherVersion;

/// A registered key together with the codec its user is on
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveKey {
    pub key: EncryptionKey,
    pub version: CipherVersion,
}

pub trait KeyProvider: Send + Sync {
    fn key_for(&self, owner: &str) -> Result<Option<ActiveKey>, StoreError>;

    /// Drop anything cached for `owner`
    fn invalidate(&self, owner: &str);
}

/// Reads `user_encryption_keys` through a record store
pub struct StoreKeyProvider<'a> {
    store: &'a dyn RecordStore,
    cache: Mutex<HashMap<String, ActiveKey>>,
}

impl<'a> StoreKeyProvider<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl KeyProvider for StoreKeyProvider<'_> {
    fn key_for(&self, owner: &str) -> Result<Option<ActiveKey>, StoreError> {
        if let Some(hit) = self
            .cache
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .get(owner)
        {
            return Ok(Some(hit.clone()));
        }

        let Some(record) = load_key(self.store, owner)? else {
            return Ok(None);
        };
        let active = ActiveKey {
            key: record.key(),
            version: record.cipher_version,
        };
        debug!(owner, fingerprint = %active.key.fingerprint(), "loaded key");
        self.cache
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(owner.to_string(), active.clone());
        Ok(Some(active))
    }

    fn invalidate(&self, owner: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(owner);
        }
    }
}
