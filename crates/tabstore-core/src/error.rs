//! Error types for tabstore operations
//!
//! Every failure is returned as a value of [`Error`]. Constraint violations are
//! always raised before the index is touched, so a statement either applies in
//! full or not at all.

use std::path::PathBuf;

use thiserror::Error;

/// Tabstore error types with detailed context
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A not-null column received an empty value
    #[error("column '{column}' cannot be NULL")]
    NotNull { column: String },

    /// A unique column received a value already held by another row
    #[error("value '{value}' already present in UNIQUE column '{column}'")]
    UniqueViolation { column: String, value: String },

    /// An explicit primary key collides with a live row
    #[error("primary key '{key}' already exists in table '{table}'")]
    PrimaryKeyViolation { table: String, key: String },

    /// The auto-assigned key counter ran past the key column's range
    #[error("no auto-assigned key left in table '{table}'")]
    KeySpaceExhausted { table: String },

    /// An update tried to assign the primary-key column
    #[error("primary key column '{column}' cannot be updated")]
    PrimaryKeyImmutable { column: String },

    /// A statement referenced a column that is not in the schema
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A value does not fit the declared column type
    #[error("column '{column}' expects {expected}, got '{value}'")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        value: String,
    },

    /// A value exceeds the configured maximum length
    #[error("value for column '{column}' is {len} bytes, limit is {max}")]
    ValueTooLong { column: String, len: usize, max: usize },

    /// The schema itself is malformed
    #[error("invalid schema: {reason}")]
    InvalidSchema { reason: String },

    /// A table or database name is not a plain identifier
    #[error("invalid name '{name}': only letters, digits and '_' are allowed")]
    InvalidName { name: String },

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("database '{0}' already exists")]
    DatabaseExists(String),

    /// SUM/AVG over something that is not a number
    #[error("{function}: {reason}")]
    AggregateType {
        function: &'static str,
        reason: String,
    },

    /// I/O operation failed
    #[error("{}", fmt_io(.path, .message, .kind))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Snapshot file is structurally damaged
    #[error("snapshot {} is corrupted: {reason}", .path.display())]
    SnapshotCorrupted { path: PathBuf, reason: String },

    /// Snapshot payload checksum verification failed
    #[error(
        "checksum mismatch in {}: expected 0x{expected:08x}, got 0x{actual:08x}",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn fmt_io(path: &Option<PathBuf>, message: &str, kind: &std::io::ErrorKind) -> String {
    match path {
        Some(path) => format!("I/O error in {}: {} ({})", path.display(), message, kind),
        None => format!("I/O error: {} ({})", message, kind),
    }
}

impl Error {
    /// True for constraint and schema violations, which never leave a partial write behind.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NotNull { .. }
                | Error::UniqueViolation { .. }
                | Error::PrimaryKeyViolation { .. }
                | Error::KeySpaceExhausted { .. }
                | Error::PrimaryKeyImmutable { .. }
                | Error::UnknownColumn { .. }
                | Error::TypeMismatch { .. }
                | Error::ValueTooLong { .. }
                | Error::InvalidSchema { .. }
                | Error::InvalidName { .. }
        )
    }

    /// True for failures while reading or writing snapshot files.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::SnapshotCorrupted { .. } | Error::ChecksumMismatch { .. }
        )
    }

    pub(crate) fn io_at(path: impl Into<PathBuf>, context: &str, err: std::io::Error) -> Self {
        Error::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", context, err),
        }
    }
}

/// Convert std::io::Error to Error::Io
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for tabstore operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ChecksumMismatch {
            path: PathBuf::from("/tmp/users.tbl"),
            expected: 0x12345678,
            actual: 0x87654321,
        };

        let display = format!("{}", err);
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match &err {
            Error::Io { kind, path, .. } => {
                assert_eq!(*kind, std::io::ErrorKind::NotFound);
                assert!(path.is_none());
            }
            _ => panic!("Expected Io error"),
        }
        assert!(err.is_persistence());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_io_display_with_path() {
        let err = Error::io_at(
            "/data/shop/users.tbl",
            "Failed to open snapshot",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = err.to_string();
        assert!(display.contains("/data/shop/users.tbl"));
        assert!(display.contains("Failed to open snapshot"));
    }

    #[test]
    fn test_validation_grouping() {
        assert!(Error::NotNull { column: "name".into() }.is_validation());
        assert!(Error::PrimaryKeyImmutable { column: "id".into() }.is_validation());
        assert!(!Error::TableNotFound("t".into()).is_validation());
        assert!(!Error::AggregateType { function: "SUM", reason: "x".into() }.is_validation());
    }
}
