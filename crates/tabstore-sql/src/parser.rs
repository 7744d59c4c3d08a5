//! Recursive-descent parser from tokens to [`Statement`].
//!
//! A WHERE clause is a flat list of `column = literal` and
//! `column LIKE literal` conditions joined by one combinator. Mixing AND
//! and OR in a single clause is rejected rather than given a precedence.

use tabstore_core::{
    Aggregate, AggregateFunc, Column, ColumnType, Combinator, Condition, OrderBy, Predicate,
    Query, SortDirection,
};

use crate::error::{SqlError, SqlResult};
use crate::statement::{Insert, Statement, Update};
use crate::tokenizer::{Keyword, Spanned, Token, Tokenizer};

/// Tokenize and parse one statement. A trailing `;` is optional.
pub fn parse(input: &str) -> SqlResult<Statement> {
    let tokens = Tokenizer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    /// `tokens` must end with [`Token::Eof`], as produced by the tokenizer.
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn parse(&mut self) -> SqlResult<Statement> {
        let statement = match self.current_token() {
            Token::Keyword(Keyword::Create) => self.parse_create()?,
            Token::Keyword(Keyword::Drop) => self.parse_drop()?,
            Token::Keyword(Keyword::Show) => self.parse_show()?,
            Token::Keyword(Keyword::Use) => {
                self.advance();
                Statement::UseDatabase(self.consume_ident()?)
            }
            Token::Keyword(Keyword::Describe | Keyword::Desc) => {
                self.advance();
                Statement::Describe(self.consume_ident()?)
            }
            Token::Keyword(Keyword::Insert) => self.parse_insert()?,
            Token::Keyword(Keyword::Select) => self.parse_select()?,
            Token::Keyword(Keyword::Update) => self.parse_update()?,
            Token::Keyword(Keyword::Delete) => self.parse_delete()?,
            other => return Err(self.error(format!("unexpected {} at start of statement", other))),
        };

        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.error(format!("unexpected {} after statement", self.current_token())));
        }
        Ok(statement)
    }

    // --- Navigation Helpers ---

    fn current(&self) -> &Spanned {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn current_token(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn error(&self, message: impl Into<String>) -> SqlError {
        SqlError::parse(self.current().position, message)
    }

    fn consume(&mut self, expected: Token) -> SqlResult<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", expected, self.current_token())))
        }
    }

    fn consume_keyword(&mut self, kw: Keyword) -> SqlResult<()> {
        self.consume(Token::Keyword(kw))
    }

    /// Advance past `kw` if it is next.
    fn accept_keyword(&mut self, kw: Keyword) -> bool {
        if *self.current_token() == Token::Keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self) -> SqlResult<String> {
        match self.current_token() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {}", other))),
        }
    }

    /// A value: quoted string, number, or bare word taken verbatim.
    fn consume_literal(&mut self) -> SqlResult<String> {
        let value = match self.current_token() {
            Token::String(s) | Token::Number(s) | Token::Ident(s) => s.clone(),
            other => return Err(self.error(format!("expected a value, found {}", other))),
        };
        self.advance();
        Ok(value)
    }

    /// `( item, item, ... )`
    fn parse_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> SqlResult<T>,
    ) -> SqlResult<Vec<T>> {
        self.consume(Token::LeftParen)?;
        let mut items = vec![item(self)?];
        loop {
            match self.current_token() {
                Token::Comma => {
                    self.advance();
                    items.push(item(self)?);
                }
                Token::RightParen => {
                    self.advance();
                    return Ok(items);
                }
                other => return Err(self.error(format!("expected ',' or ')', found {}", other))),
            }
        }
    }

    // --- Statements ---

    fn parse_create(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Create)?;
        if self.accept_keyword(Keyword::Database) {
            return Ok(Statement::CreateDatabase(self.consume_ident()?));
        }
        self.consume_keyword(Keyword::Table)?;
        let name = self.consume_ident()?;
        let columns = self.parse_list(Self::parse_column_def)?;
        Ok(Statement::CreateTable { name, columns })
    }

    /// `name TYPE [(n)] [PRIMARY KEY | NOT NULL | UNIQUE]...`
    fn parse_column_def(&mut self) -> SqlResult<Column> {
        let name = self.consume_ident()?;
        let column_type = match self.current_token() {
            Token::Keyword(Keyword::Int | Keyword::Integer) => ColumnType::Int,
            Token::Keyword(Keyword::String | Keyword::Text | Keyword::Varchar) => {
                ColumnType::String
            }
            other => return Err(self.error(format!("expected a column type, found {}", other))),
        };
        self.advance();

        // VARCHAR(255) and friends: the width is accepted and ignored
        if matches!(self.current_token(), Token::LeftParen) {
            self.advance();
            match self.current_token() {
                Token::Number(_) => self.advance(),
                other => return Err(self.error(format!("expected a width, found {}", other))),
            }
            self.consume(Token::RightParen)?;
        }

        let mut column = Column::new(name, column_type);
        loop {
            if self.accept_keyword(Keyword::Primary) {
                self.consume_keyword(Keyword::Key)?;
                column = column.primary_key();
            } else if self.accept_keyword(Keyword::Not) {
                self.consume_keyword(Keyword::Null)?;
                column = column.not_null();
            } else if self.accept_keyword(Keyword::Unique) {
                column = column.unique();
            } else {
                return Ok(column);
            }
        }
    }

    fn parse_drop(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Drop)?;
        if self.accept_keyword(Keyword::Database) {
            return Ok(Statement::DropDatabase(self.consume_ident()?));
        }
        self.consume_keyword(Keyword::Table)?;
        Ok(Statement::DropTable(self.consume_ident()?))
    }

    fn parse_show(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Show)?;
        if self.accept_keyword(Keyword::Databases) {
            Ok(Statement::ShowDatabases)
        } else if self.accept_keyword(Keyword::Tables) {
            Ok(Statement::ShowTables)
        } else {
            Err(self.error(format!("expected DATABASES or TABLES, found {}", self.current_token())))
        }
    }

    fn parse_insert(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Insert)?;
        self.consume_keyword(Keyword::Into)?;
        let table = self.consume_ident()?;
        let columns = self.parse_list(Self::consume_ident)?;
        self.consume_keyword(Keyword::Values)?;
        let values_at = self.current().position;
        let values = self.parse_list(Self::consume_literal)?;
        if columns.len() != values.len() {
            return Err(SqlError::parse(
                values_at,
                format!("{} columns but {} values", columns.len(), values.len()),
            ));
        }
        Ok(Statement::Insert(Insert { table, columns, values }))
    }

    fn parse_select(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Select)?;
        let aggregate = self.parse_projection()?;
        self.consume_keyword(Keyword::From)?;
        let table = self.consume_ident()?;

        let mut query = Query::all();
        if self.accept_keyword(Keyword::Where) {
            query = query.filter(self.parse_predicate()?);
        }

        if let Some(agg) = aggregate {
            if matches!(self.current_token(), Token::Keyword(Keyword::Order | Keyword::Limit)) {
                return Err(self.error("ORDER BY and LIMIT cannot be combined with an aggregate"));
            }
            return Ok(Statement::Select { table, query: query.aggregate(agg) });
        }

        if self.accept_keyword(Keyword::Order) {
            self.consume_keyword(Keyword::By)?;
            let column = self.consume_ident()?;
            let direction = if self.accept_keyword(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.accept_keyword(Keyword::Asc);
                SortDirection::Asc
            };
            query = query.order_by(OrderBy { column, direction });
        }

        if self.accept_keyword(Keyword::Limit) {
            query = query.limit(self.parse_limit()?);
        }

        Ok(Statement::Select { table, query })
    }

    /// `*` or one aggregate call. Returns the aggregate, if any.
    fn parse_projection(&mut self) -> SqlResult<Option<Aggregate>> {
        let func = match self.current_token() {
            Token::Star => {
                self.advance();
                return Ok(None);
            }
            Token::Keyword(Keyword::Count) => AggregateFunc::Count,
            Token::Keyword(Keyword::Sum) => AggregateFunc::Sum,
            Token::Keyword(Keyword::Avg) => AggregateFunc::Avg,
            other => {
                return Err(self.error(format!("expected '*' or an aggregate, found {}", other)))
            }
        };
        self.advance();
        self.consume(Token::LeftParen)?;
        let column = match self.current_token() {
            Token::Star => tabstore_core::pipeline::WILDCARD.to_string(),
            Token::Ident(name) => name.clone(),
            other => return Err(self.error(format!("expected a column or '*', found {}", other))),
        };
        self.advance();
        self.consume(Token::RightParen)?;
        Ok(Some(Aggregate { func, column }))
    }

    fn parse_limit(&mut self) -> SqlResult<usize> {
        let text = match self.current_token() {
            Token::Number(n) => n.clone(),
            other => {
                return Err(self.error(format!("expected a number after LIMIT, found {}", other)))
            }
        };
        let n: i64 = text
            .parse()
            .map_err(|_| self.error(format!("LIMIT must be an integer, got {}", text)))?;
        if n < 0 {
            return Err(SqlError::InvalidLimit(n));
        }
        self.advance();
        usize::try_from(n).map_err(|_| SqlError::InvalidLimit(n))
    }

    fn parse_update(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Update)?;
        let table = self.consume_ident()?;
        self.consume_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.consume_ident()?;
            self.consume(Token::Equal)?;
            assignments.push((column, self.consume_literal()?));
            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        if !self.accept_keyword(Keyword::Where) {
            return Err(SqlError::MissingWhere("UPDATE"));
        }
        let predicate = self.parse_predicate()?;
        Ok(Statement::Update(Update { table, assignments, predicate }))
    }

    fn parse_delete(&mut self) -> SqlResult<Statement> {
        self.consume_keyword(Keyword::Delete)?;
        self.consume_keyword(Keyword::From)?;
        let table = self.consume_ident()?;
        if !self.accept_keyword(Keyword::Where) {
            return Err(SqlError::MissingWhere("DELETE"));
        }
        let predicate = self.parse_predicate()?;
        Ok(Statement::Delete { table, predicate })
    }

    // --- WHERE ---

    fn parse_predicate(&mut self) -> SqlResult<Predicate> {
        let mut conditions = vec![self.parse_condition()?];
        let mut combinator: Option<Combinator> = None;

        loop {
            let next = match self.current_token() {
                Token::Keyword(Keyword::And) => Combinator::And,
                Token::Keyword(Keyword::Or) => Combinator::Or,
                _ => break,
            };
            match combinator {
                Some(c) if c != next => {
                    return Err(self.error("AND and OR cannot be mixed in one WHERE clause"));
                }
                _ => combinator = Some(next),
            }
            self.advance();
            conditions.push(self.parse_condition()?);
        }

        Ok(Predicate::new(conditions, combinator.unwrap_or_default()))
    }

    fn parse_condition(&mut self) -> SqlResult<Condition> {
        let column = self.consume_ident()?;
        if self.accept_keyword(Keyword::Like) {
            return Ok(Condition::like(column, self.consume_literal()?));
        }
        self.consume(Token::Equal)?;
        Ok(Condition::eq(column, self.consume_literal()?))
    }
}
