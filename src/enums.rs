// src/enums.rs
//! Public enum types used throughout the crate
//!
//! Central location for the small enums that end up in config files,
//! database columns and reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ciphertext format of a migrated entry
///
/// Stored as a plain integer in config files and in the key registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
#[non_exhaustive]
pub enum CipherVersion {
    /// Repeating-key XOR keystream, bare base64 output
    #[default]
    V1,
    /// AES-256-GCM behind a `v2:` envelope
    V2,
}

impl CipherVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            CipherVersion::V1 => 1,
            CipherVersion::V2 => 2,
        }
    }
}

impl TryFrom<u8> for CipherVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CipherVersion::V1),
            2 => Ok(CipherVersion::V2),
            other => Err(format!("unsupported cipher version {other}")),
        }
    }
}

impl From<CipherVersion> for u8 {
    fn from(version: CipherVersion) -> Self {
        version.as_u8()
    }
}

impl fmt::Display for CipherVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

/// Explicit migration status written next to every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Legacy,
    Migrated,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Legacy => "legacy",
            EntryStatus::Migrated => "migrated",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
