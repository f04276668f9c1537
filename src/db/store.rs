// src/db/store.rs
//! Generic CRUD contract over the three journal tables

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::consts::{ENTRIES_BACKUP_TABLE, ENTRIES_TABLE, USER_KEYS_TABLE};

/// One row, column name → JSON value
pub type Row = Map<String, Value>;

/// Set on a selected row whose stored JSON could not be decoded; holds the reason
pub const DECODE_ERROR_KEY: &str = "_decode_error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Entries,
    EntriesBackup,
    UserKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// Arbitrary JSON, stored serialized
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

const ENTRY_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("owner_id", ColumnKind::Text),
    col("payload", ColumnKind::Json),
    col("status", ColumnKind::Text),
    col("updated_at", ColumnKind::Text),
];

const BACKUP_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("owner_id", ColumnKind::Text),
    col("payload", ColumnKind::Json),
    col("created_at", ColumnKind::Text),
];

const KEY_COLUMNS: &[Column] = &[
    col("user_id", ColumnKind::Text),
    col("encryption_key", ColumnKind::Text),
    col("cipher_version", ColumnKind::Integer),
    col("created_at", ColumnKind::Text),
];

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Entries => ENTRIES_TABLE,
            Table::EntriesBackup => ENTRIES_BACKUP_TABLE,
            Table::UserKeys => USER_KEYS_TABLE,
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            Table::Entries | Table::EntriesBackup => "id",
            Table::UserKeys => "user_id",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Table::Entries => ENTRY_COLUMNS,
            Table::EntriesBackup => BACKUP_COLUMNS,
            Table::UserKeys => KEY_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Result<Column, StoreError> {
        self.columns()
            .iter()
            .find(|c| c.name == name)
            .copied()
            .ok_or_else(|| StoreError::UnknownColumn {
                table: self,
                column: name.to_string(),
            })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conjunction of `column = value` conditions; empty matches every row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(column, value)
    }

    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Evaluate against an in-memory row; absent columns compare as null
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("{table}: no row with key {id}")]
    NotFound { table: Table, id: String },

    #[error("{table}: unknown column {column}")]
    UnknownColumn { table: Table, column: String },

    #[error("{table}: invalid row: {reason}")]
    InvalidRow { table: Table, reason: String },

    #[error("store refused the write: {0}")]
    Rejected(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// The four operations the engine needs from a record store
///
/// Implementations must be shareable across the all-users worker pool.
pub trait RecordStore: Send + Sync {
    /// Rows matching `filter`, in the store's natural order
    fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    /// Overwrite `fields` on the row whose primary key is `id`
    fn update(&self, table: Table, id: &str, fields: Row) -> Result<(), StoreError>;

    /// Insert `row`, or merge it into the row sharing its primary key
    fn upsert(&self, table: Table, row: Row) -> Result<(), StoreError>;

    /// Remove matching rows, returning how many went
    fn delete(&self, table: Table, filter: &Filter) -> Result<usize, StoreError>;
}

/// Source of every principal known to the deployment
pub trait PrincipalDirectory: Send + Sync {
    fn list_principals(&self) -> Result<Vec<String>, StoreError>;
}

/// Primary key of `row` as text
pub fn row_key(table: Table, row: &Row) -> Result<String, StoreError> {
    match row.get(table.primary_key()) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(StoreError::InvalidRow {
            table,
            reason: format!("missing {}", table.primary_key()),
        }),
    }
}

/// Primary key of `row` for reports and logs, even when the row is unusable
pub fn row_label(table: Table, row: &Row) -> String {
    row.get(table.primary_key())
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .unwrap_or("<missing id>")
        .to_string()
}

/// Why a selected row's JSON columns failed to decode, if they did
pub fn decode_error(row: &Row) -> Option<&str> {
    row.get(DECODE_ERROR_KEY).and_then(Value::as_str)
}
