// src/db/memory.rs
//! In-process record store
//!
//! Rows keep insertion order, like SQLite's rowid order. Writes can be made
//! to fail on purpose so the failure paths of the engine can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::db::store::{row_key, Filter, PrincipalDirectory, RecordStore, Row, StoreError, Table};

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, Vec<Row>>,
    failing_updates: HashSet<String>,
    fail_upserts: bool,
    fail_deletes: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Seed a row directly, bypassing fault injection
    pub fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        row_key(table, &row)?;
        self.lock()?.rows.entry(table).or_default().push(row);
        Ok(())
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.lock()
            .map(|t| t.rows.get(&table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Make every `update` of the row keyed `id` fail
    pub fn fail_updates_for(&self, id: impl Into<String>) {
        if let Ok(mut t) = self.lock() {
            t.failing_updates.insert(id.into());
        }
    }

    pub fn fail_upserts(&self, fail: bool) {
        if let Ok(mut t) = self.lock() {
            t.fail_upserts = fail;
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        if let Ok(mut t) = self.lock() {
            t.fail_deletes = fail;
        }
    }
}

fn key_of(table: Table, row: &Row) -> Option<&str> {
    row.get(table.primary_key()).and_then(Value::as_str)
}

fn check_columns(table: Table, row: &Row) -> Result<(), StoreError> {
    for name in row.keys() {
        table.column(name)?;
    }
    Ok(())
}

impl RecordStore for MemoryStore {
    fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        for (name, _) in filter.conditions() {
            table.column(name)?;
        }
        let tables = self.lock()?;
        Ok(tables
            .rows
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    fn update(&self, table: Table, id: &str, fields: Row) -> Result<(), StoreError> {
        check_columns(table, &fields)?;
        let mut tables = self.lock()?;
        if tables.failing_updates.contains(id) {
            return Err(StoreError::Rejected(format!("injected update failure for {id}")));
        }
        let row = tables
            .rows
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| key_of(table, r) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;
        let pk = table.primary_key();
        for (name, value) in fields {
            if name != pk {
                row.insert(name, value);
            }
        }
        Ok(())
    }

    fn upsert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        check_columns(table, &row)?;
        let id = row_key(table, &row)?;
        let mut tables = self.lock()?;
        if tables.fail_upserts {
            return Err(StoreError::Rejected(format!("injected upsert failure for {id}")));
        }
        let rows = tables.rows.entry(table).or_default();
        match rows.iter().position(|r| key_of(table, r) == Some(id.as_str())) {
            Some(i) => rows[i].extend(row),
            None => rows.push(row),
        }
        Ok(())
    }

    fn delete(&self, table: Table, filter: &Filter) -> Result<usize, StoreError> {
        for (name, _) in filter.conditions() {
            table.column(name)?;
        }
        let mut tables = self.lock()?;
        if tables.fail_deletes {
            return Err(StoreError::Rejected("injected delete failure".into()));
        }
        let rows = tables.rows.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok(before - rows.len())
    }
}

impl PrincipalDirectory for MemoryStore {
    fn list_principals(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.lock()?;
        let mut seen = HashSet::new();
        let mut owners = Vec::new();
        for row in tables.rows.get(&Table::Entries).into_iter().flatten() {
            if let Some(owner) = row.get("owner_id").and_then(Value::as_str) {
                if seen.insert(owner.to_string()) {
                    owners.push(owner.to_string());
                }
            }
        }
        Ok(owners)
    }
}
