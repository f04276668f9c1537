// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{Config, MigrationConfig, ServerConfig, StoreConfig};
use crate::consts::{
    DEFAULT_BIND, DEFAULT_PRINCIPAL, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TRANSCRIPTION_MODEL,
    DEFAULT_TRANSCRIPTION_URL, DEFAULT_WORKERS,
};
use crate::enums::CipherVersion;

pub const CONFIG_PATH_ENV: &str = "JOURNAL_VAULT_CONFIG";
pub const DATABASE_ENV: &str = "JOURNAL_VAULT_DB";
pub const TRANSCRIPTION_KEY_ENV: &str = "JOURNAL_VAULT_TRANSCRIPTION_KEY";

pub const DEFAULT_CONFIG_PATH: &str = "journal-vault.toml";
pub const DEFAULT_DATABASE_PATH: &str = "data/journal.db";

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_principal: DEFAULT_PRINCIPAL.into(),
            workers: DEFAULT_WORKERS,
            cipher_version: CipherVersion::V1,
            require_backup: true,
            create_backups: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            transcription_url: DEFAULT_TRANSCRIPTION_URL.into(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.into(),
            transcription_api_key: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            migration: MigrationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
