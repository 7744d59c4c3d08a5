//! Column definitions and the constraint rules derived from them.

use std::fmt;

use hashbrown::HashMap;

use crate::error::{Error, Result};

/// A stored row: column name to text value.
///
/// Values are kept as text whatever the declared type; numeric meaning is
/// applied only when comparing or aggregating.
pub type Row = HashMap<String, String>;

/// Scalar column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::String => "STRING",
        }
    }

    pub(crate) fn to_tag(self) -> u8 {
        match self {
            ColumnType::Int => 0,
            ColumnType::String => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ColumnType::Int),
            1 => Some(ColumnType::String),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            not_null: false,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Check a proposed value against the not-null, type and length rules.
    ///
    /// Uniqueness needs the rest of the table and is checked by the caller.
    pub fn check_value(&self, value: &str, max_len: usize) -> Result<()> {
        if self.not_null && value.is_empty() {
            return Err(Error::NotNull { column: self.name.clone() });
        }
        if value.len() > max_len {
            return Err(Error::ValueTooLong {
                column: self.name.clone(),
                len: value.len(),
                max: max_len,
            });
        }
        if self.column_type == ColumnType::Int
            && !value.is_empty()
            && value.trim().parse::<i64>().is_err()
        {
            return Err(Error::TypeMismatch {
                column: self.name.clone(),
                expected: "INT",
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Flags packed for the snapshot format: bit0 pk, bit1 not null, bit2 unique.
    pub(crate) fn flags(&self) -> u8 {
        (self.primary_key as u8) | ((self.not_null as u8) << 1) | ((self.unique as u8) << 2)
    }

    pub(crate) fn with_flags(mut self, flags: u8) -> Self {
        self.primary_key = flags & 0b001 != 0;
        self.not_null = flags & 0b010 != 0;
        self.unique = flags & 0b100 != 0;
        self
    }
}

/// Ordered column list with exactly one primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    primary_key: usize,
}

impl Schema {
    /// Build a schema, rejecting duplicate names, bad identifiers and
    /// anything other than exactly one primary-key column.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidSchema { reason: "a table needs at least one column".into() });
        }
        for (i, col) in columns.iter().enumerate() {
            validate_name(&col.name)?;
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::InvalidSchema {
                    reason: format!("duplicate column '{}'", col.name),
                });
            }
        }
        let keys: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        let primary_key = match keys.as_slice() {
            [one] => *one,
            [] => {
                return Err(Error::InvalidSchema {
                    reason: "exactly one PRIMARY KEY column is required".into(),
                })
            }
            _ => {
                return Err(Error::InvalidSchema {
                    reason: format!(
                        "{} PRIMARY KEY columns declared, only one allowed",
                        keys.len()
                    ),
                })
            }
        };
        Ok(Self { columns, primary_key })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    /// Column names in declaration order, the order results are rendered in.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Table and database names double as file and directory names.
pub fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidName { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<Column> {
        vec![
            Column::new("id", ColumnType::Int).primary_key(),
            Column::new("email", ColumnType::String).not_null().unique(),
            Column::new("age", ColumnType::Int),
        ]
    }

    #[test]
    fn test_schema_primary_key() {
        let schema = Schema::new(users()).unwrap();
        assert_eq!(schema.primary_key().name, "id");
        assert_eq!(schema.column_names(), vec!["id", "email", "age"]);
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_schema_requires_one_primary_key() {
        let none = vec![Column::new("a", ColumnType::Int)];
        assert!(matches!(Schema::new(none), Err(Error::InvalidSchema { .. })));

        let two = vec![
            Column::new("a", ColumnType::Int).primary_key(),
            Column::new("b", ColumnType::Int).primary_key(),
        ];
        assert!(matches!(Schema::new(two), Err(Error::InvalidSchema { .. })));
    }

    #[test]
    fn test_schema_rejects_duplicates_and_empty() {
        let dup = vec![
            Column::new("a", ColumnType::Int).primary_key(),
            Column::new("a", ColumnType::String),
        ];
        assert!(matches!(Schema::new(dup), Err(Error::InvalidSchema { .. })));
        assert!(matches!(Schema::new(vec![]), Err(Error::InvalidSchema { .. })));
    }

    #[test]
    fn test_check_value() {
        let schema = Schema::new(users()).unwrap();
        let email = schema.column("email").unwrap();
        let age = schema.column("age").unwrap();

        assert!(matches!(email.check_value("", 100), Err(Error::NotNull { .. })));
        assert!(email.check_value("a@b.c", 100).is_ok());
        assert!(age.check_value("", 100).is_ok());
        assert!(age.check_value("-42", 100).is_ok());
        assert!(matches!(age.check_value("forty", 100), Err(Error::TypeMismatch { .. })));
        assert!(matches!(email.check_value("abcdef", 3), Err(Error::ValueTooLong { .. })));
    }

    #[test]
    fn test_flags_roundtrip() {
        let col = Column::new("x", ColumnType::String).not_null().unique();
        let back = Column::new("x", ColumnType::String).with_flags(col.flags());
        assert_eq!(col, back);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("users_2024").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a b").is_err());
    }
}
