//! A database is a directory of table snapshots.
//!
//! Layout: `<root_dir>/<database>/<table>.tbl`
//!
//! Opening a database loads every snapshot in its directory. Files that
//! fail to load are skipped with a warning so that one damaged table does
//! not hide the rest.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::{validate_name, Schema};
use crate::snapshot::{SnapshotStore, TABLE_EXTENSION};
use crate::table::Table;

/// The table set of one database directory.
#[derive(Debug)]
pub struct Database {
    name: String,
    dir: PathBuf,
    config: Config,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    /// Create the database directory and open it.
    pub fn create(config: &Config, name: &str) -> Result<Self> {
        check_config(config)?;
        validate_name(name)?;
        let dir = config.root_dir.join(name);
        if dir.exists() {
            return Err(Error::DatabaseExists(name.to_string()));
        }
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io_at(&dir, "Failed to create database directory", e))?;
        tracing::info!(database = name, path = %dir.display(), "database created");
        Self::open(config, name)
    }

    /// Open an existing database and load all of its tables.
    pub fn open(config: &Config, name: &str) -> Result<Self> {
        check_config(config)?;
        validate_name(name)?;
        let dir = config.root_dir.join(name);
        if !dir.is_dir() {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }

        let mut tables = HashMap::new();
        let listing = fs::read_dir(&dir)
            .map_err(|e| Error::io_at(&dir, "Failed to read database directory", e))?;
        for entry in listing {
            let path = entry
                .map_err(|e| Error::io_at(&dir, "Failed to read directory entry", e))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION) {
                continue;
            }
            match Table::open(&path, config) {
                Ok(table) => {
                    tables.insert(table.name().to_string(), Arc::new(table));
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable table"
                    );
                }
            }
        }

        tracing::info!(database = name, tables = tables.len(), "database opened");
        Ok(Self {
            name: name.to_string(),
            dir,
            config: config.clone(),
            tables: RwLock::new(tables),
        })
    }

    /// Remove a database directory and every table in it.
    pub fn destroy(config: &Config, name: &str) -> Result<()> {
        validate_name(name)?;
        let dir = config.root_dir.join(name);
        if !dir.is_dir() {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir)
            .map_err(|e| Error::io_at(&dir, "Failed to remove database directory", e))?;
        tracing::info!(database = name, "database dropped");
        Ok(())
    }

    /// Names of all databases under the root, sorted. A missing root is empty.
    pub fn list(config: &Config) -> Result<Vec<String>> {
        let root = &config.root_dir;
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let listing =
            fs::read_dir(root).map_err(|e| Error::io_at(root, "Failed to read root directory", e))?;
        for entry in listing {
            let entry = entry.map_err(|e| Error::io_at(root, "Failed to read directory entry", e))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an empty table and write its first snapshot.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<Table>> {
        validate_name(name)?;
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }
        let table = Arc::new(Table::create(&self.dir, name, schema, &self.config)?);
        tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Forget a table and delete its snapshot file.
    ///
    /// Handles already given out keep working in memory, but their writes
    /// will recreate the file. Callers drop them first.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables
            .remove(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        SnapshotStore::new(self.config.sync_mode).remove(table.path())?;
        tracing::info!(table = name, database = %self.name, "table dropped");
        Ok(())
    }

    /// Table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }
}

fn check_config(config: &Config) -> Result<()> {
    config.validate().map_err(Error::InvalidConfig)
}
