//! Tabstore Core: embedded tabular storage engine
//!
//! Named tables with typed, constrained columns. Rows live in a
//! primary-key-ordered index in RAM and each table is persisted as one
//! checksummed snapshot file, replaced atomically after every mutation.
//!
//! # Architecture
//!
//! - **Index**: `BTreeMap` behind a `parking_lot::RwLock`, ordered by primary key
//! - **Table**: constraint checks before mutation, snapshot after
//! - **Queries**: flat AND/OR predicates with `=` and `LIKE`, then
//!   order/limit or COUNT/SUM/AVG
//! - **Snapshots**: write-temp, sync, rename, sync-dir
//!
//! # No Query Language
//!
//! This crate takes typed requests only. The SQL-ish front-end and the
//! interactive shell live in `tabstore-sql`.

pub mod config;
pub mod database;
pub mod durability;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod predicate;
pub mod schema;
pub mod snapshot;
pub mod table;

// Re-export key types for convenience
pub use config::{Config, KeyPolicy, SyncMode};
pub use database::Database;
pub use error::{Error, Result};
pub use index::OrderedIndex;
pub use pipeline::{
    Aggregate, AggregateFunc, AggregateValue, OrderBy, QueryOutput, QueryShape, ResultSet,
    SortDirection,
};
pub use predicate::{like_match, Combinator, CompareOp, Condition, Predicate};
pub use schema::{Column, ColumnType, Row, Schema};
pub use snapshot::{SnapshotRecord, SnapshotStore};
pub use table::{Query, Table};
