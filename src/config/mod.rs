// src/config/mod.rs
//! Configuration system for journal-vault
//!
//! TOML file plus environment overrides, cached once per process by `load`.

pub use app::{load, load_from, Config, MigrationConfig, ServerConfig, StoreConfig};
pub use defaults::{CONFIG_PATH_ENV, DATABASE_ENV, DEFAULT_CONFIG_PATH, TRANSCRIPTION_KEY_ENV};

mod app;
mod defaults;
