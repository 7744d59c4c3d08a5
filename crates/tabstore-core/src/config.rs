//! Configuration management for tabstore
//!
//! Provides durability presets and builder-style setters for the
//! storage root, snapshot sync behaviour and primary-key assignment.

use std::path::{Path, PathBuf};

/// How snapshot files are flushed before the atomic rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync the temp file and the parent directory (survives power loss)
    Durable,
    /// Rely on the OS page cache; rename is still atomic
    Fast,
}

/// How a missing primary key is filled in on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Per-table counter persisted in the snapshot; ids are never reused
    Monotonic,
    /// `row_count + 1`; a collision with a live key is rejected
    RowCount,
}

/// Tabstore configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one subdirectory per database
    pub root_dir: PathBuf,
    /// Snapshot flush behaviour
    pub sync_mode: SyncMode,
    /// Primary-key auto-assignment scheme
    pub key_policy: KeyPolicy,
    /// Maximum length of a single stored value in bytes
    pub max_value_len: usize,
}

impl Config {
    /// Full durability: every snapshot is synced before and after the rename.
    pub fn durable() -> Self {
        Self {
            root_dir: PathBuf::from("./data"),
            sync_mode: SyncMode::Durable,
            key_policy: KeyPolicy::Monotonic,
            max_value_len: 64 * 1024,
        }
    }

    /// No fsync. Suited to scratch data and bulk loads.
    pub fn fast() -> Self {
        Self {
            sync_mode: SyncMode::Fast,
            ..Self::durable()
        }
    }

    /// Fast preset rooted at `dir`, used by tests and benches.
    pub fn ephemeral<P: AsRef<Path>>(dir: P) -> Self {
        Self::fast().with_root(dir)
    }

    pub fn with_root<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.root_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    pub fn with_max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = len;
        self
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.root_dir.as_os_str().is_empty() {
            return Err("root_dir must not be empty".into());
        }
        if self.max_value_len == 0 || self.max_value_len > 16 * 1024 * 1024 {
            return Err("max_value_len must be in [1, 16MB]".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::durable()
    }
}
