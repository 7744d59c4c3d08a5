//! Error types for the statement front-end

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Tokenizer or parser rejected the input
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// A table statement ran before `USE <database>`
    #[error("no database selected, run USE <database> first")]
    NoActiveDatabase,

    /// UPDATE or DELETE without a WHERE clause
    #[error("{0} requires a WHERE clause")]
    MissingWhere(&'static str),

    #[error("LIMIT must be a non-negative integer, got {0}")]
    InvalidLimit(i64),

    /// Failure reported by the storage engine
    #[error(transparent)]
    Engine(#[from] tabstore_core::Error),
}

impl SqlError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        SqlError::Parse { position, message: message.into() }
    }
}

pub type SqlResult<T> = std::result::Result<T, SqlError>;
