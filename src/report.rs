// src/report.rs
//! In-memory run summaries: built fresh per invocation, printed, then dropped

use std::fmt;

use serde::Serialize;

use crate::enums::CipherVersion;

/// One entry that did not make it, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub id: String,
    pub reason: String,
}

fn push_failure(failures: &mut Vec<Failure>, id: &str, reason: impl fmt::Display) {
    failures.push(Failure {
        id: id.to_string(),
        reason: reason.to_string(),
    });
}

fn write_failures(f: &mut fmt::Formatter<'_>, failures: &[Failure]) -> fmt::Result {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(f, "  failed ids:")?;
    for failure in failures {
        writeln!(f, "    {}  ({})", failure.id, failure.reason)?;
    }
    Ok(())
}

/// Outcome of migrating one principal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub owner: String,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_version: Option<CipherVersion>,
    /// Set when a fatal error stopped this principal inside an all-users run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    pub fn aborted(owner: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            aborted: Some(reason.to_string()),
            ..Self::new(owner)
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, id: &str, reason: impl fmt::Display) {
        self.failed += 1;
        push_failure(&mut self.failures, id, reason);
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== MIGRATION {} ===", self.owner)?;
        if let Some(reason) = &self.aborted {
            writeln!(f, "  ABORTED: {reason}")?;
        }
        if let (Some(fp), Some(version)) = (&self.key_fingerprint, self.cipher_version) {
            writeln!(f, "  key: {fp} ({version})")?;
        }
        writeln!(f, "  succeeded: {}", self.succeeded)?;
        writeln!(f, "  skipped:   {}", self.skipped)?;
        writeln!(f, "  failed:    {}", self.failed)?;
        write_failures(f, &self.failures)
    }
}

/// Outcome of restoring one principal from backup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollbackReport {
    pub owner: String,
    pub restored: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    pub key_deleted: bool,
    /// Why the key was kept, when it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_note: Option<String>,
}

impl RollbackReport {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, id: &str, reason: impl fmt::Display) {
        self.failed += 1;
        push_failure(&mut self.failures, id, reason);
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== ROLLBACK {} ===", self.owner)?;
        writeln!(f, "  restored: {}", self.restored)?;
        writeln!(f, "  failed:   {}", self.failed)?;
        match (&self.key_deleted, &self.key_note) {
            (true, _) => writeln!(f, "  key:      deleted")?,
            (false, Some(note)) => writeln!(f, "  key:      kept ({note})")?,
            (false, None) => writeln!(f, "  key:      kept")?,
        }
        write_failures(f, &self.failures)
    }
}

/// Outcome of a read-only decrypt check over one principal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub owner: String,
    pub verified: usize,
    pub legacy: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    pub key_present: bool,
}

impl CheckReport {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, id: &str, reason: impl fmt::Display) {
        self.failed += 1;
        push_failure(&mut self.failures, id, reason);
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CHECK {} ===", self.owner)?;
        if !self.key_present {
            writeln!(f, "  no key registered")?;
        }
        writeln!(f, "  verified: {}", self.verified)?;
        writeln!(f, "  legacy:   {}", self.legacy)?;
        writeln!(f, "  failed:   {}", self.failed)?;
        write_failures(f, &self.failures)
    }
}
