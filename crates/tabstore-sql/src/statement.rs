//! Parsed statements. Every command the shell understands is one variant.

use tabstore_core::{Column, Predicate, Query};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateDatabase(String),
    DropDatabase(String),
    ShowDatabases,
    UseDatabase(String),
    CreateTable { name: String, columns: Vec<Column> },
    DropTable(String),
    ShowTables,
    Describe(String),
    Insert(Insert),
    Select { table: String, query: Query },
    Update(Update),
    Delete { table: String, predicate: Predicate },
}

/// `INSERT INTO table (columns) VALUES (values)`; the lists have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, String)>,
    pub predicate: Predicate,
}

impl Statement {
    /// Whether the statement runs against the active database.
    pub fn needs_database(&self) -> bool {
        !matches!(
            self,
            Statement::CreateDatabase(_)
                | Statement::DropDatabase(_)
                | Statement::ShowDatabases
                | Statement::UseDatabase(_)
        )
    }
}
