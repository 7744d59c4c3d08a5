//! Database catalog and statement execution.
//!
//! A session owns the storage root and at most one open (active)
//! database. Table statements run against the active database and fail
//! with [`SqlError::NoActiveDatabase`] when none is selected.

use tabstore_core::{AggregateValue, Config, Database, QueryOutput, ResultSet, Row, Schema};

use crate::error::{SqlError, SqlResult};
use crate::parser::parse;
use crate::statement::{Insert, Statement, Update};

/// What a statement produced, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(ResultSet),
    Scalar(AggregateValue),
    /// `count` rows were inserted, updated or deleted
    Affected { verb: &'static str, count: usize },
    Message(String),
    /// A one-column listing such as SHOW TABLES
    Names { header: &'static str, names: Vec<String> },
}

pub struct Session {
    config: Config,
    active: Option<Database>,
}

impl Session {
    pub fn new(config: Config) -> SqlResult<Self> {
        config.validate().map_err(tabstore_core::Error::InvalidConfig)?;
        Ok(Self { config, active: None })
    }

    /// Name of the active database, if one is selected.
    pub fn active(&self) -> Option<&str> {
        self.active.as_ref().map(Database::name)
    }

    /// Parse and execute one line of input.
    pub fn run(&mut self, input: &str) -> SqlResult<Outcome> {
        let statement = parse(input)?;
        self.execute(statement)
    }

    pub fn execute(&mut self, statement: Statement) -> SqlResult<Outcome> {
        tracing::debug!(?statement, "executing");
        if statement.needs_database() && self.active.is_none() {
            return Err(SqlError::NoActiveDatabase);
        }

        match statement {
            Statement::CreateDatabase(name) => {
                Database::create(&self.config, &name)?;
                Ok(Outcome::Message(format!("Database '{}' created.", name)))
            }
            Statement::DropDatabase(name) => {
                Database::destroy(&self.config, &name)?;
                if self.active() == Some(name.as_str()) {
                    self.active = None;
                }
                Ok(Outcome::Message(format!("Database '{}' deleted successfully.", name)))
            }
            Statement::ShowDatabases => Ok(Outcome::Names {
                header: "Database",
                names: Database::list(&self.config)?,
            }),
            Statement::UseDatabase(name) => {
                let db = Database::open(&self.config, &name)?;
                self.active = Some(db);
                Ok(Outcome::Message(format!("Database changed to '{}'.", name)))
            }
            Statement::CreateTable { name, columns } => {
                let schema = Schema::new(columns)?;
                self.database()?.create_table(&name, schema)?;
                Ok(Outcome::Message(format!("Table '{}' created.", name)))
            }
            Statement::DropTable(name) => {
                self.database()?.drop_table(&name)?;
                Ok(Outcome::Message(format!("Table '{}' deleted successfully.", name)))
            }
            Statement::ShowTables => Ok(Outcome::Names {
                header: "Table",
                names: self.database()?.list_tables(),
            }),
            Statement::Describe(name) => {
                let table = self.database()?.table(&name)?;
                Ok(Outcome::Rows(describe(table.describe())))
            }
            Statement::Insert(Insert { table, columns, values }) => {
                let table = self.database()?.table(&table)?;
                let row: Row = columns.into_iter().zip(values).collect();
                table.insert(row)?;
                Ok(Outcome::Affected { verb: "inserted", count: 1 })
            }
            Statement::Select { table, query } => {
                let table = self.database()?.table(&table)?;
                match table.select(&query)? {
                    QueryOutput::Rows(set) => Ok(Outcome::Rows(set)),
                    QueryOutput::Scalar(value) => Ok(Outcome::Scalar(value)),
                }
            }
            Statement::Update(Update { table, assignments, predicate }) => {
                let table = self.database()?.table(&table)?;
                let count = table.update(&predicate, &assignments[..])?;
                Ok(Outcome::Affected { verb: "updated", count })
            }
            Statement::Delete { table, predicate } => {
                let table = self.database()?.table(&table)?;
                let count = table.delete(&predicate)?;
                Ok(Outcome::Affected { verb: "deleted", count })
            }
        }
    }

    fn database(&self) -> SqlResult<&Database> {
        self.active.as_ref().ok_or(SqlError::NoActiveDatabase)
    }
}

/// Schema as a Field/Type/Key/Null/Extra listing.
pub fn describe(schema: &Schema) -> ResultSet {
    let columns: Vec<String> =
        ["Field", "Type", "Key", "Null", "Extra"].iter().map(|s| s.to_string()).collect();
    let rows = schema
        .columns()
        .iter()
        .map(|col| {
            let mut row = Row::new();
            row.insert("Field".into(), col.name.clone());
            row.insert("Type".into(), col.column_type.to_string());
            row.insert("Key".into(), if col.primary_key { "PRI" } else { "" }.into());
            row.insert("Null".into(), if col.not_null { "NO" } else { "YES" }.into());
            row.insert("Extra".into(), if col.unique { "UNIQUE" } else { "" }.into());
            row
        })
        .collect();
    ResultSet { columns, rows }
}
