//! Ordered primary-key index.
//!
//! Entries live in a `BTreeMap` behind a single `parking_lot::RwLock`:
//! readers (`get`, `get_all`) share the lock, writers (`insert`, `delete`)
//! hold it exclusively. There is no per-entry locking.
//!
//! A table takes [`OrderedIndex::write`] for the whole of a statement so that
//! validation, mutation and the snapshot all see one consistent state.

use std::collections::BTreeMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::schema::Row;

/// Key-sorted, deduplicated row entries.
#[derive(Debug, Default, Clone)]
pub struct Entries {
    map: BTreeMap<String, Row>,
}

impl Entries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup in O(log n).
    pub fn get(&self, key: &str) -> Option<&Row> {
        self.map.get(key)
    }

    /// Insert or replace. Returns the previous row for this key, if any.
    pub fn insert(&mut self, key: String, row: Row) -> Option<Row> {
        self.map.insert(key, row)
    }

    /// Remove the entry if present. An absent key is not an error.
    pub fn delete(&mut self, key: &str) -> Option<Row> {
        self.map.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Rows in ascending key order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.map.values()
    }

    /// `(key, row)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Row)> + '_ {
        self.map.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> + '_ {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Thread-safe ordered index.
///
/// All methods take `&self`; the convenience methods lock for the duration
/// of the single call.
#[derive(Debug, Default)]
pub struct OrderedIndex {
    entries: RwLock<Entries>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Entries) -> Self {
        Self { entries: RwLock::new(entries) }
    }

    /// Shared access; blocks only while a writer holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read()
    }

    /// Exclusive access for a whole statement.
    pub fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write()
    }

    pub fn get(&self, key: &str) -> Option<Row> {
        self.entries.read().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, row: Row) {
        self.entries.write().insert(key.into(), row);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().delete(key).is_some()
    }

    /// Full scan in ascending key order; the basis of every table scan.
    pub fn get_all(&self) -> Vec<Row> {
        self.entries.read().rows().cloned().collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn row(id: &str, name: &str) -> Row {
        let mut r = Row::new();
        r.insert("id".to_string(), id.to_string());
        r.insert("name".to_string(), name.to_string());
        r
    }

    #[test]
    fn test_insert_get() {
        let index = OrderedIndex::new();
        index.insert("1", row("1", "ada"));
        assert_eq!(index.get("1"), Some(row("1", "ada")));
        assert_eq!(index.get("2"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let index = OrderedIndex::new();
        index.insert("1", row("1", "ada"));
        index.insert("1", row("1", "grace"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("1").unwrap()["name"], "grace");
    }

    #[test]
    fn test_get_all_sorted() {
        let index = OrderedIndex::new();
        for key in ["c", "a", "d", "b"] {
            index.insert(key, row(key, key));
        }
        let names: Vec<String> = index.get_all().into_iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(index.keys(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_keys_sort_as_text() {
        let index = OrderedIndex::new();
        for key in ["10", "2", "1"] {
            index.insert(key, row(key, key));
        }
        assert_eq!(index.keys(), vec!["1", "10", "2"]);
    }

    #[test]
    fn test_delete() {
        let index = OrderedIndex::new();
        index.insert("k", row("k", "v"));
        assert!(index.delete("k"));
        assert!(!index.contains_key("k"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let index = OrderedIndex::new();
        index.insert("k", row("k", "v"));
        assert!(!index.delete("nope"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_write_guard_batch() {
        let index = OrderedIndex::new();
        {
            let mut entries = index.write();
            entries.insert("b".into(), row("b", "2"));
            entries.insert("a".into(), row("a", "1"));
            entries.delete("b");
        }
        assert_eq!(index.keys(), vec!["a"]);
    }

    #[test]
    fn test_concurrent_reads() {
        let index = Arc::new(OrderedIndex::new());
        for i in 0..100 {
            let key = format!("k{:03}", i);
            index.insert(key.clone(), row(&key, &format!("v{}", i)));
        }

        let mut handles = vec![];
        for _ in 0..8 {
            let idx = Arc::clone(&index);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let r = idx.get(&format!("k{:03}", i)).unwrap();
                    assert_eq!(r["name"], format!("v{}", i));
                }
                assert_eq!(idx.get_all().len(), 100);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
