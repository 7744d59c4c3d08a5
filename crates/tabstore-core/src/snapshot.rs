//! Snapshot persistence: one checksummed file per table.
//!
//! File format: SnapshotHeader (32 bytes) + payload
//!
//! Saving uses the atomic rename pattern:
//! 1. Encode the whole table into one buffer
//! 2. Write it to `<table>.tbl.tmp`
//! 3. Sync the temp file (durable mode)
//! 4. Rename over `<table>.tbl` (atomic on POSIX)
//! 5. Sync the parent directory (durable mode)
//!
//! A crash before the rename leaves the previous snapshot intact and an
//! orphaned temp file, which the next save overwrites.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::SyncMode;
use crate::durability::{sync_dir, sync_file};
use crate::error::{Error, Result};
use crate::index::Entries;
use crate::schema::{Column, ColumnType, Row, Schema};

/// Magic bytes identifying a snapshot: "TBLS"
pub const MAGIC: [u8; 4] = *b"TBLS";

/// Current format version
pub const VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Extension of snapshot files inside a database directory
pub const TABLE_EXTENSION: &str = "tbl";

/// Fixed-size snapshot header
///
/// Layout:
///   [0..4]   magic:    [u8;4] - "TBLS"
///   [4..6]   version:  u16 LE
///   [6..8]   reserved
///   [8..16]  length:   u64 LE - payload length in bytes
///   [16..20] checksum: u32 LE - CRC32C of payload
///   [20..32] reserved, zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub length: u64,
    pub checksum: u32,
}

impl SnapshotHeader {
    pub fn new(length: u64, checksum: u32) -> Self {
        Self { magic: MAGIC, version: VERSION, length, checksum }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.length.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        let mut length = [0u8; 8];
        length.copy_from_slice(&buf[8..16]);
        Self {
            magic,
            version: u16::from_le_bytes([buf[4], buf[5]]),
            length: u64::from_le_bytes(length),
            checksum: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
        }
    }
}

/// Borrowed view of a table at save time.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'a> {
    pub name: &'a str,
    pub schema: &'a Schema,
    pub next_id: u64,
    pub entries: &'a Entries,
}

/// Decoded snapshot: the full materialization of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub name: String,
    pub schema: Schema,
    pub next_id: u64,
    /// Rows in ascending primary-key order
    pub rows: Vec<Row>,
}

impl SnapshotRecord {
    /// Rebuild key-sorted entries, keyed by the primary-key column.
    ///
    /// An empty or duplicated key means the file was not written by us.
    pub fn into_entries(self, path: &Path) -> Result<(String, Schema, u64, Entries)> {
        let pk = self.schema.primary_key().name.clone();
        let mut entries = Entries::new();
        for (i, row) in self.rows.into_iter().enumerate() {
            let key = match row.get(&pk) {
                Some(k) if !k.is_empty() => k.clone(),
                _ => return Err(corrupted(path, format!("row {} has no primary key value", i))),
            };
            if entries.insert(key.clone(), row).is_some() {
                return Err(corrupted(path, format!("duplicate primary key '{}'", key)));
            }
        }
        Ok((self.name, self.schema, self.next_id, entries))
    }
}

/// Encode a table into header + payload bytes.
pub fn encode(view: &SnapshotView<'_>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(64 + view.entries.len() * 32);
    put_str(&mut payload, view.name);
    payload.extend_from_slice(&view.next_id.to_le_bytes());

    let columns = view.schema.columns();
    payload.extend_from_slice(&(columns.len() as u16).to_le_bytes());
    for col in columns {
        put_str(&mut payload, &col.name);
        payload.push(col.column_type.to_tag());
        payload.push(col.flags());
    }

    payload.extend_from_slice(&(view.entries.len() as u64).to_le_bytes());
    for row in view.entries.rows() {
        for col in columns {
            put_str(&mut payload, row.get(&col.name).map(String::as_str).unwrap_or(""));
        }
    }

    let header = SnapshotHeader::new(payload.len() as u64, crc32c::crc32c(&payload));
    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(&payload);
    buffer
}

/// Decode and verify a snapshot. `path` is used for error context only.
pub fn decode(data: &[u8], path: &Path) -> Result<SnapshotRecord> {
    if data.len() < HEADER_SIZE {
        return Err(corrupted(
            path,
            format!("file too short: {} bytes, need at least {}", data.len(), HEADER_SIZE),
        ));
    }
    let mut hdr = [0u8; HEADER_SIZE];
    hdr.copy_from_slice(&data[..HEADER_SIZE]);
    let header = SnapshotHeader::from_bytes(&hdr);

    if header.magic != MAGIC {
        return Err(corrupted(path, format!("bad magic {:02x?}", header.magic)));
    }
    if header.version != VERSION {
        return Err(corrupted(path, format!("unsupported version {}", header.version)));
    }
    let available = (data.len() - HEADER_SIZE) as u64;
    if available != header.length {
        return Err(corrupted(
            path,
            format!("payload is {} bytes, header says {}", available, header.length),
        ));
    }

    let payload = &data[HEADER_SIZE..];
    let actual = crc32c::crc32c(payload);
    if actual != header.checksum {
        return Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum,
            actual,
        });
    }

    let mut r = Reader { buf: payload, pos: 0, path };
    let name = r.str()?;
    let next_id = r.u64()?;

    let column_count = r.u16()? as usize;
    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let col_name = r.str()?;
        let tag = r.u8()?;
        let column_type = ColumnType::from_tag(tag)
            .ok_or_else(|| corrupted(path, format!("unknown column type tag {}", tag)))?;
        let flags = r.u8()?;
        columns.push(Column::new(col_name, column_type).with_flags(flags));
    }
    let schema = Schema::new(columns).map_err(|e| corrupted(path, e.to_string()))?;

    let row_count = r.u64()?;
    let mut rows = Vec::new();
    for _ in 0..row_count {
        let mut row = Row::with_capacity(schema.len());
        for col in schema.columns() {
            row.insert(col.name.clone(), r.str()?);
        }
        rows.push(row);
    }
    if r.pos != payload.len() {
        return Err(corrupted(path, format!("{} trailing bytes", payload.len() - r.pos)));
    }

    Ok(SnapshotRecord { name, schema, next_id, rows })
}

/// Reads and writes table snapshot files.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotStore {
    sync_mode: SyncMode,
}

impl SnapshotStore {
    pub fn new(sync_mode: SyncMode) -> Self {
        Self { sync_mode }
    }

    /// Atomically replace the snapshot at `path`.
    pub fn save(&self, path: &Path, view: &SnapshotView<'_>) -> Result<()> {
        let bytes = encode(view);
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| Error::io_at(parent, "Failed to create database directory", e))?;

        let tmp = temp_path(path);
        {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .map_err(|e| Error::io_at(&tmp, "Failed to create snapshot temp file", e))?;
            file.write_all(&bytes)
                .map_err(|e| Error::io_at(&tmp, "Failed to write snapshot", e))?;
            if self.sync_mode == SyncMode::Durable {
                sync_file(&file).map_err(|e| Error::io_at(&tmp, "Failed to sync snapshot", e))?;
            }
        }

        fs::rename(&tmp, path).map_err(|e| Error::io_at(path, "Failed to replace snapshot", e))?;

        if self.sync_mode == SyncMode::Durable {
            sync_dir(parent).map_err(|e| Error::io_at(parent, "Failed to sync directory", e))?;
        }

        tracing::debug!(
            table = view.name,
            rows = view.entries.len(),
            bytes = bytes.len(),
            path = %path.display(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Read and verify the snapshot at `path`.
    pub fn load(&self, path: &Path) -> Result<SnapshotRecord> {
        let data = fs::read(path).map_err(|e| Error::io_at(path, "Failed to read snapshot", e))?;
        decode(&data, path)
    }

    /// Remove a snapshot and any leftover temp file.
    pub fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io_at(path, "Failed to remove snapshot", e)),
        }
        let _ = fs::remove_file(temp_path(path));
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn corrupted(path: &Path, reason: String) -> Error {
    Error::SnapshotCorrupted { path: path.to_path_buf(), reason }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len()).ok_or_else(|| {
            corrupted(
                self.path,
                format!("payload truncated: need {} bytes at offset {}", n, self.pos),
            )
        })?;
        let buf = self.buf;
        let slice = &buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn str(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| corrupted(self.path, format!("invalid UTF-8 at offset {}", offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int).primary_key(),
            Column::new("name", ColumnType::String).not_null(),
            Column::new("email", ColumnType::String).unique(),
        ])
        .unwrap()
    }

    fn view<'a>(schema: &'a Schema, next_id: u64, entries: &'a Entries) -> SnapshotView<'a> {
        SnapshotView { name: "t", schema, next_id, entries }
    }

    fn entries(n: usize) -> Entries {
        let mut e = Entries::new();
        for i in 1..=n {
            let mut row = Row::new();
            row.insert("id".into(), i.to_string());
            row.insert("name".into(), format!("user{}", i));
            let email = if i % 2 == 0 { String::new() } else { format!("u{}@x.io", i) };
            row.insert("email".into(), email);
            e.insert(i.to_string(), row);
        }
        e
    }

    #[test]
    fn test_header_size() {
        let h = SnapshotHeader::new(10, 0xdead_beef);
        assert_eq!(h.to_bytes().len(), HEADER_SIZE);
        assert_eq!(SnapshotHeader::from_bytes(&h.to_bytes()), h);
    }

    #[test]
    fn test_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shop").join("users.tbl");
        let schema = schema();
        let e = entries(5);
        let store = SnapshotStore::new(SyncMode::Durable);

        store
            .save(&path, &SnapshotView { name: "users", schema: &schema, next_id: 6, entries: &e })
            .unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let record = store.load(&path).unwrap();
        assert_eq!(record.name, "users");
        assert_eq!(record.schema, schema);
        assert_eq!(record.next_id, 6);
        assert_eq!(record.rows, e.rows().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_table() {
        let schema = schema();
        let e = Entries::new();
        let bytes = encode(&SnapshotView { name: "t", schema: &schema, next_id: 1, entries: &e });
        let record = decode(&bytes, Path::new("t.tbl")).unwrap();
        assert!(record.rows.is_empty());
        assert_eq!(record.schema, schema);
    }

    #[test]
    fn test_corrupted_magic_detected() {
        let schema = schema();
        let e = entries(2);
        let mut bytes = encode(&view(&schema, 3, &e));
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes, Path::new("t.tbl")), Err(Error::SnapshotCorrupted { .. })));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let schema = schema();
        let e = entries(2);
        let mut bytes = encode(&view(&schema, 3, &e));
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode(&bytes, Path::new("t.tbl")), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_truncated_file_detected() {
        let schema = schema();
        let e = entries(3);
        let bytes = encode(&view(&schema, 4, &e));
        let cut = &bytes[..bytes.len() - 5];
        assert!(matches!(decode(cut, Path::new("t.tbl")), Err(Error::SnapshotCorrupted { .. })));
        assert!(matches!(
            decode(&bytes[..10], Path::new("t.tbl")),
            Err(Error::SnapshotCorrupted { .. })
        ));
    }

    #[test]
    fn test_empty_primary_key_rejected_on_load() {
        let schema = schema();
        let mut e = Entries::new();
        let mut row = Row::new();
        row.insert("id".into(), String::new());
        row.insert("name".into(), "ghost".into());
        row.insert("email".into(), String::new());
        e.insert("ghost".into(), row);

        let bytes = encode(&SnapshotView { name: "t", schema: &schema, next_id: 1, entries: &e });
        let record = decode(&bytes, Path::new("t.tbl")).unwrap();
        assert!(matches!(
            record.into_entries(Path::new("t.tbl")),
            Err(Error::SnapshotCorrupted { .. })
        ));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(SyncMode::Fast);
        assert!(store.remove(&tmp.path().join("nope.tbl")).is_ok());
    }
}
