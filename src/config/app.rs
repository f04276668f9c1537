// src/config/app.rs
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use super::defaults::{CONFIG_PATH_ENV, DATABASE_ENV, DEFAULT_CONFIG_PATH, TRANSCRIPTION_KEY_ENV};
use crate::enums::CipherVersion;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub migration: MigrationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub default_principal: String,
    /// Worker threads for the all-users run
    pub workers: usize,
    pub cipher_version: CipherVersion,
    /// Refuse to migrate entries that have no backup snapshot
    pub require_backup: bool,
    /// Snapshot legacy entries before migrating them
    pub create_backups: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub transcription_url: String,
    pub transcription_model: String,
    pub transcription_api_key: Option<String>,
    pub request_timeout_ms: u64,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load the process-wide config once; later calls return the cached value
pub fn load() -> Result<&'static Config> {
    if let Some(conf) = CONFIG.get() {
        return Ok(conf);
    }
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let conf = load_from(&path)?;
    Ok(CONFIG.get_or_init(|| conf))
}

/// Read config from `path`, falling back to defaults if the file is missing
pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let mut conf: Config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Environment(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)?
    } else {
        warn!(path = %path.display(), "config file not found, using built-in defaults");
        Config::default()
    };

    if let Ok(db) = env::var(DATABASE_ENV) {
        conf.store.database_path = PathBuf::from(db);
    }
    if let Ok(key) = env::var(TRANSCRIPTION_KEY_ENV) {
        conf.server.transcription_api_key = Some(key);
    }
    if conf
        .server
        .transcription_api_key
        .as_deref()
        .is_some_and(|k| k.trim().is_empty())
    {
        conf.server.transcription_api_key = None;
    }

    conf.validate()?;
    Ok(conf)
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.store.database_path.as_os_str().is_empty() {
            return Err(CoreError::Environment(
                "store.database_path must not be empty".into(),
            ));
        }
        if self.migration.workers == 0 {
            return Err(CoreError::Environment(
                "migration.workers must be at least 1".into(),
            ));
        }
        if self.migration.default_principal.trim().is_empty() {
            return Err(CoreError::Environment(
                "migration.default_principal must not be empty".into(),
            ));
        }
        Ok(())
    }
}
