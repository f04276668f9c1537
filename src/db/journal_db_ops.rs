// src/db/journal_db_ops.rs
//! SQLite-backed record store
//!
//! Implements the generic CRUD contract on top of the journal schema in
//! `journal_db_conn`. Column names only ever come from the static table
//! definitions, never from caller strings, so they can be spliced into SQL.
//!
//! A JSON cell that does not parse does not fail the select. The column comes
//! back as null and the row carries [`DECODE_ERROR_KEY`] with the reason, so
//! callers can fail that one record and keep going.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use tracing::warn;

use crate::config::Config;
use crate::db::journal_db_conn::{create_journal_db, open_in_memory, open_journal_db};
use crate::db::store::{
    row_key, Column, ColumnKind, Filter, PrincipalDirectory, RecordStore, Row, StoreError, Table,
    DECODE_ERROR_KEY,
};
use crate::error::Result;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open an existing database; fails if the file is missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_connection(open_journal_db(path)?))
    }

    /// Open or create a database file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_connection(create_journal_db(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(open_in_memory()?))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.store.database_path)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> std::result::Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn to_sql(table: Table, column: Column, value: &Value) -> std::result::Result<SqlValue, StoreError> {
    let invalid = || StoreError::InvalidRow {
        table,
        reason: format!("{} expects {:?}, got {value}", column.name, column.kind),
    };
    match (column.kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Json, v) => serde_json::to_string(v)
            .map(SqlValue::Text)
            .map_err(|_| invalid()),
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::Text(s.clone())),
        (ColumnKind::Integer, Value::Number(n)) => n.as_i64().map(SqlValue::Integer).ok_or_else(invalid),
        (ColumnKind::Integer, Value::Bool(b)) => Ok(SqlValue::Integer(i64::from(*b))),
        _ => Err(invalid()),
    }
}

fn from_sql(table: Table, column: Column, value: SqlValue) -> std::result::Result<Value, StoreError> {
    match (column.kind, value) {
        (_, SqlValue::Null) => Ok(Value::Null),
        (ColumnKind::Json, SqlValue::Text(text)) => {
            serde_json::from_str(&text).map_err(|e| StoreError::InvalidRow {
                table,
                reason: format!("{} holds invalid JSON: {e}", column.name),
            })
        }
        (_, SqlValue::Text(text)) => Ok(Value::String(text)),
        (_, SqlValue::Integer(i)) => Ok(Value::Number(i.into())),
        (_, SqlValue::Real(f)) => Ok(Number::from_f64(f).map_or(Value::Null, Value::Number)),
        (_, SqlValue::Blob(_)) => Err(StoreError::InvalidRow {
            table,
            reason: format!("{} holds a blob", column.name),
        }),
    }
}

fn where_clause(
    table: Table,
    filter: &Filter,
    params: &mut Vec<SqlValue>,
) -> std::result::Result<String, StoreError> {
    let mut clauses = Vec::new();
    for (name, value) in filter.conditions() {
        let column = table.column(name)?;
        if value.is_null() {
            clauses.push(format!("{} IS NULL", column.name));
        } else {
            params.push(to_sql(table, column, value)?);
            clauses.push(format!("{} = ?{}", column.name, params.len()));
        }
    }
    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("WHERE {}", clauses.join(" AND ")))
    }
}

impl RecordStore for SqliteStore {
    fn select(&self, table: Table, filter: &Filter) -> std::result::Result<Vec<Row>, StoreError> {
        let columns = table.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let mut params = Vec::new();
        let where_sql = where_clause(table, filter, &mut params)?;
        let sql = format!(
            "SELECT {} FROM {} {where_sql} ORDER BY rowid",
            names.join(", "),
            table.name()
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..columns.len())
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(raw
            .into_iter()
            .map(|values| {
                let mut row = Row::new();
                for (column, value) in columns.iter().zip(values) {
                    let decoded = match from_sql(table, *column, value) {
                        Ok(decoded) => decoded,
                        Err(err) => {
                            warn!(%table, column = column.name, error = %err, "undecodable cell");
                            row.insert(DECODE_ERROR_KEY.to_string(), Value::String(err.to_string()));
                            Value::Null
                        }
                    };
                    row.insert(column.name.to_string(), decoded);
                }
                row
            })
            .collect())
    }

    fn update(&self, table: Table, id: &str, fields: Row) -> std::result::Result<(), StoreError> {
        let pk = table.primary_key();
        let mut sets = Vec::new();
        let mut params = Vec::new();
        for (name, value) in &fields {
            if name == pk {
                continue;
            }
            let column = table.column(name)?;
            params.push(to_sql(table, column, value)?);
            sets.push(format!("{} = ?{}", column.name, params.len()));
        }
        if sets.is_empty() {
            return Ok(());
        }
        params.push(SqlValue::Text(id.to_string()));
        let sql = format!(
            "UPDATE {} SET {} WHERE {pk} = ?{}",
            table.name(),
            sets.join(", "),
            params.len()
        );

        let changed = self.conn()?.execute(&sql, params_from_iter(params.iter()))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn upsert(&self, table: Table, row: Row) -> std::result::Result<(), StoreError> {
        row_key(table, &row)?;
        let pk = table.primary_key();
        let mut names = Vec::new();
        let mut params = Vec::new();
        for (name, value) in &row {
            let column = table.column(name)?;
            names.push(column.name);
            params.push(to_sql(table, column, value)?);
        }

        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
        let updates: Vec<String> = names
            .iter()
            .filter(|name| **name != pk)
            .map(|name| format!("{name} = excluded.{name}"))
            .collect();
        let on_conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({pk}) {on_conflict}",
            table.name(),
            names.join(", "),
            placeholders.join(", ")
        );

        self.conn()?.execute(&sql, params_from_iter(params.iter()))?;
        Ok(())
    }

    fn delete(&self, table: Table, filter: &Filter) -> std::result::Result<usize, StoreError> {
        let mut params = Vec::new();
        let where_sql = where_clause(table, filter, &mut params)?;
        let sql = format!("DELETE FROM {} {where_sql}", table.name());
        Ok(self.conn()?.execute(&sql, params_from_iter(params.iter()))?)
    }
}

impl PrincipalDirectory for SqliteStore {
    /// Distinct entry owners, in order of their first entry
    fn list_principals(&self) -> std::result::Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner_id FROM entries GROUP BY owner_id ORDER BY MIN(rowid)",
        )?;
        let owners = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(owners)
    }
}
