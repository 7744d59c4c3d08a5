//! Tabstore SQL: statement front-end for the tabstore engine
//!
//! Turns one line of SQL-ish text into a typed request against
//! `tabstore-core` and renders the outcome as text.
//!
//! # Pipeline
//!
//! - **Tokenizer**: characters to positioned tokens
//! - **Parser**: recursive descent to a closed [`Statement`] enum
//! - **Session**: database catalog, active-database selection, execution
//! - **Render**: ASCII tables and status lines

pub mod error;
pub mod parser;
pub mod render;
pub mod session;
pub mod statement;
pub mod tokenizer;

pub use error::{SqlError, SqlResult};
pub use parser::parse;
pub use render::render;
pub use session::{Outcome, Session};
pub use statement::Statement;
