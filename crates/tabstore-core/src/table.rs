//! A named table: one schema, one ordered index, one snapshot file.
//!
//! Every mutating statement holds the index write guard from validation
//! through persistence. Constraint checks run before the index is touched,
//! so a rejected statement leaves both memory and disk unchanged.
//!
//! A snapshot failure after the in-memory change is reported to the caller.
//! The index keeps the new state and the file stays one statement behind
//! until the next successful save.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::{Config, KeyPolicy};
use crate::error::{Error, Result};
use crate::index::{Entries, OrderedIndex};
use crate::pipeline::{self, OrderBy, QueryOutput, QueryShape};
use crate::predicate::Predicate;
use crate::schema::{validate_name, Column, ColumnType, Row, Schema};
use crate::snapshot::{SnapshotStore, SnapshotView, TABLE_EXTENSION};

/// A read query: filter, then either order/limit or aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicate: Predicate,
    pub shape: QueryShape,
}

impl Query {
    /// Every row, in primary-key order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        let limit = match std::mem::take(&mut self.shape) {
            QueryShape::Rows { limit, .. } => limit,
            QueryShape::Aggregate(_) => None,
        };
        self.shape = QueryShape::Rows { order_by: Some(order), limit };
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        let order_by = match std::mem::take(&mut self.shape) {
            QueryShape::Rows { order_by, .. } => order_by,
            QueryShape::Aggregate(_) => None,
        };
        self.shape = QueryShape::Rows { order_by, limit: Some(n) };
        self
    }

    pub fn aggregate(mut self, agg: pipeline::Aggregate) -> Self {
        self.shape = QueryShape::Aggregate(agg);
        self
    }
}

/// Table handle. Shared between threads as `Arc<Table>`.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    path: PathBuf,
    index: OrderedIndex,
    /// Next auto-assigned key; only changed while the index write guard is held
    next_id: Mutex<u64>,
    store: SnapshotStore,
    key_policy: KeyPolicy,
    max_value_len: usize,
}

impl Table {
    /// Create an empty table in `dir` and write its first snapshot.
    ///
    /// Fails with [`Error::TableExists`] if the file is already there, even
    /// when it could not be loaded.
    pub fn create(dir: &Path, name: &str, schema: Schema, config: &Config) -> Result<Self> {
        validate_name(name)?;
        let path = table_path(dir, name);
        if path.exists() {
            return Err(Error::TableExists(name.to_string()));
        }
        let table = Self {
            name: name.to_string(),
            schema,
            path,
            index: OrderedIndex::new(),
            next_id: Mutex::new(1),
            store: SnapshotStore::new(config.sync_mode),
            key_policy: config.key_policy,
            max_value_len: config.max_value_len,
        };
        {
            let entries = table.index.read();
            table.persist(&entries, 1)?;
        }
        tracing::info!(table = %table.name, columns = table.schema.len(), "table created");
        Ok(table)
    }

    /// Rebuild a table from its snapshot file.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let store = SnapshotStore::new(config.sync_mode);
        let record = store.load(path)?;
        let (name, schema, next_id, entries) = record.into_entries(path)?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if stem != name {
            return Err(Error::SnapshotCorrupted {
                path: path.to_path_buf(),
                reason: format!("file holds table '{}'", name),
            });
        }

        tracing::info!(table = %name, rows = entries.len(), "table loaded");
        Ok(Self {
            name,
            schema,
            path: path.to_path_buf(),
            index: OrderedIndex::from_entries(entries),
            next_id: Mutex::new(next_id.max(1)),
            store,
            key_policy: config.key_policy,
            max_value_len: config.max_value_len,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The table's schema, in declaration order.
    pub fn describe(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Key the next auto-assigned insert would start probing from.
    pub fn next_id(&self) -> u64 {
        *self.next_id.lock()
    }

    /// Insert one row and return its primary key.
    ///
    /// Unknown columns are rejected, missing ones are stored as empty text.
    /// An absent or empty primary key is assigned according to the
    /// configured [`KeyPolicy`].
    pub fn insert(&self, row: Row) -> Result<String> {
        let mut entries = self.index.write();

        for column in row.keys() {
            self.check_column(column)?;
        }
        let mut normalized = Row::with_capacity(self.schema.len());
        for col in self.schema.columns() {
            let value = row.get(&col.name).cloned().unwrap_or_default();
            normalized.insert(col.name.clone(), value);
        }

        let pk = self.schema.primary_key();
        let mut next_id = self.next_id.lock();
        let explicit = normalized.get(&pk.name).cloned().unwrap_or_default();
        let (key, advanced) = if explicit.is_empty() {
            self.assign_key(&entries, *next_id)?
        } else {
            if entries.contains_key(&explicit) {
                return Err(Error::PrimaryKeyViolation { table: self.name.clone(), key: explicit });
            }
            let advanced = match (self.key_policy, explicit.trim().parse::<u64>()) {
                (KeyPolicy::Monotonic, Ok(n)) if n >= *next_id && n < self.key_limit() => n + 1,
                _ => *next_id,
            };
            (explicit, advanced)
        };
        normalized.insert(pk.name.clone(), key.clone());

        for col in self.schema.columns() {
            let value = normalized.get(&col.name).map(String::as_str).unwrap_or("");
            col.check_value(value, self.max_value_len)?;
            if col.unique
                && !col.primary_key
                && entries.rows().any(|r| r.get(&col.name).map(String::as_str) == Some(value))
            {
                return Err(Error::UniqueViolation {
                    column: col.name.clone(),
                    value: value.to_string(),
                });
            }
        }

        entries.insert(key.clone(), normalized);
        *next_id = advanced;
        tracing::trace!(table = %self.name, key = %key, "row inserted");
        self.persist(&entries, advanced)?;
        Ok(key)
    }

    /// Every row in primary-key order.
    pub fn select_all(&self) -> Vec<Row> {
        self.index.get_all()
    }

    /// Rows matching `predicate`, in primary-key order.
    pub fn select_where(&self, predicate: &Predicate) -> Result<Vec<Row>> {
        self.check_predicate(predicate)?;
        let entries = self.index.read();
        Ok(entries.rows().filter(|r| predicate.evaluate(r)).cloned().collect())
    }

    /// Filter, then order/limit or aggregate.
    pub fn select(&self, query: &Query) -> Result<QueryOutput> {
        match &query.shape {
            QueryShape::Rows { order_by: Some(order), .. } => {
                self.check_column(&order.column)?;
            }
            QueryShape::Aggregate(agg) if !agg.is_wildcard() => {
                self.check_column(&agg.column)?;
            }
            _ => {}
        }
        let rows = self.select_where(&query.predicate)?;
        pipeline::run(rows, self.schema.column_names(), &query.shape)
    }

    /// Apply `assignments` to every row matching `predicate`.
    ///
    /// Assignments are validated before matching, so assigning the primary
    /// key fails even when nothing matches. Zero matches returns `Ok(0)`
    /// without writing the snapshot.
    pub fn update<K, V>(&self, predicate: &Predicate, assignments: &[(K, V)]) -> Result<usize>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = self.index.write();

        for (column, value) in assignments {
            let col = self.check_column(column.as_ref())?;
            if col.primary_key {
                return Err(Error::PrimaryKeyImmutable { column: col.name.clone() });
            }
            col.check_value(value.as_ref(), self.max_value_len)?;
        }
        self.check_predicate(predicate)?;

        let matched: Vec<String> = entries
            .iter()
            .filter(|(_, row)| predicate.evaluate(row))
            .map(|(key, _)| key.clone())
            .collect();
        if matched.is_empty() {
            return Ok(0);
        }

        // rows in the match set are exempt from the uniqueness check
        let matched_keys: HashSet<&str> = matched.iter().map(String::as_str).collect();
        for (column, value) in assignments {
            let (column, value) = (column.as_ref(), value.as_ref());
            let unique = self.schema.column(column).map(|c| c.unique).unwrap_or(false);
            if !unique {
                continue;
            }
            let clash = entries.iter().any(|(key, row)| {
                !matched_keys.contains(key.as_str())
                    && row.get(column).map(String::as_str) == Some(value)
            });
            if clash {
                return Err(Error::UniqueViolation {
                    column: column.to_string(),
                    value: value.to_string(),
                });
            }
        }

        for key in &matched {
            if let Some(mut row) = entries.get(key).cloned() {
                for (column, value) in assignments {
                    row.insert(column.as_ref().to_string(), value.as_ref().to_string());
                }
                entries.insert(key.clone(), row);
            }
        }

        let next_id = *self.next_id.lock();
        self.persist(&entries, next_id)?;
        Ok(matched.len())
    }

    /// Remove every row matching `predicate`. Zero matches returns `Ok(0)`
    /// without writing the snapshot.
    pub fn delete(&self, predicate: &Predicate) -> Result<usize> {
        let mut entries = self.index.write();
        self.check_predicate(predicate)?;

        let matched: Vec<String> = entries
            .iter()
            .filter(|(_, row)| predicate.evaluate(row))
            .map(|(key, _)| key.clone())
            .collect();
        if matched.is_empty() {
            return Ok(0);
        }
        for key in &matched {
            entries.delete(key);
        }

        let next_id = *self.next_id.lock();
        self.persist(&entries, next_id)?;
        Ok(matched.len())
    }

    /// Pick a key for an insert that did not supply one. Returns the key and
    /// the counter value to store afterwards.
    fn assign_key(&self, entries: &Entries, next_id: u64) -> Result<(String, u64)> {
        match self.key_policy {
            KeyPolicy::Monotonic => {
                let limit = self.key_limit();
                let exhausted = || Error::KeySpaceExhausted { table: self.name.clone() };
                let mut id = next_id;
                while entries.contains_key(&id.to_string()) {
                    id = id.checked_add(1).ok_or_else(exhausted)?;
                }
                if id > limit {
                    return Err(exhausted());
                }
                Ok((id.to_string(), id.saturating_add(1)))
            }
            KeyPolicy::RowCount => {
                let key = (entries.len() + 1).to_string();
                if entries.contains_key(&key) {
                    return Err(Error::PrimaryKeyViolation { table: self.name.clone(), key });
                }
                Ok((key, next_id))
            }
        }
    }

    /// Largest key the counter may hand out for this table's key column.
    fn key_limit(&self) -> u64 {
        match self.schema.primary_key().column_type {
            ColumnType::Int => i64::MAX as u64,
            ColumnType::String => u64::MAX,
        }
    }

    fn check_column(&self, name: &str) -> Result<&Column> {
        self.schema.column(name).ok_or_else(|| Error::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    fn check_predicate(&self, predicate: &Predicate) -> Result<()> {
        for column in predicate.columns() {
            self.check_column(column)?;
        }
        Ok(())
    }

    fn persist(&self, entries: &Entries, next_id: u64) -> Result<()> {
        self.store.save(
            &self.path,
            &SnapshotView { name: &self.name, schema: &self.schema, next_id, entries },
        )
    }
}

/// `<dir>/<name>.tbl`
pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, TABLE_EXTENSION))
}
