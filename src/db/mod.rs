// src/db/mod.rs
//! Record store contract and its adapters
//!
//! The migration engine only ever talks to [`RecordStore`]; SQLite and the
//! in-memory store are two interchangeable implementations of it.

pub mod journal_db_conn;
pub mod journal_db_ops;
pub mod memory;
pub mod records;
pub mod store;

pub use journal_db_ops::SqliteStore;
pub use memory::MemoryStore;
pub use records::{BackupSnapshot, Entry, KeyRecord};
pub use store::{
    decode_error, row_label, Column, ColumnKind, Filter, PrincipalDirectory, RecordStore, Row,
    StoreError, Table, DECODE_ERROR_KEY,
};
