//! Lexical scanner: raw statement text into positioned tokens.

use std::fmt;

use crate::error::{SqlError, SqlResult};

/// Reserved words, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Create,
    Drop,
    Database,
    Databases,
    Table,
    Tables,
    Use,
    Show,
    Describe,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    And,
    Or,
    Like,
    Update,
    Set,
    Delete,
    Order,
    By,
    Asc,
    /// Also the short form of DESCRIBE
    Desc,
    Limit,
    Count,
    Sum,
    Avg,
    Primary,
    Key,
    Not,
    Null,
    Unique,
    Int,
    Integer,
    String,
    Text,
    Varchar,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        let kw = match word.to_ascii_uppercase().as_str() {
            "CREATE" => Keyword::Create,
            "DROP" => Keyword::Drop,
            "DATABASE" => Keyword::Database,
            "DATABASES" => Keyword::Databases,
            "TABLE" => Keyword::Table,
            "TABLES" => Keyword::Tables,
            "USE" => Keyword::Use,
            "SHOW" => Keyword::Show,
            "DESCRIBE" => Keyword::Describe,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "SELECT" => Keyword::Select,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "LIKE" => Keyword::Like,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "COUNT" => Keyword::Count,
            "SUM" => Keyword::Sum,
            "AVG" => Keyword::Avg,
            "PRIMARY" => Keyword::Primary,
            "KEY" => Keyword::Key,
            "NOT" => Keyword::Not,
            "NULL" => Keyword::Null,
            "UNIQUE" => Keyword::Unique,
            "INT" => Keyword::Int,
            "INTEGER" => Keyword::Integer,
            "STRING" => Keyword::String,
            "TEXT" => Keyword::Text,
            "VARCHAR" => Keyword::Varchar,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    /// Table, column or database name
    Ident(String),
    /// Numeric literal, kept as written (optional sign, optional fraction)
    Number(String),
    /// Quoted literal with the quotes removed
    String(String),
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Star,
    Equal,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(kw) => write!(f, "{}", format!("{:?}", kw).to_uppercase()),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::Star => f.write_str("'*'"),
            Token::Equal => f.write_str("'='"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// A token and the character offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), position: 0 }
    }

    /// Scan the whole input. The last token is always [`Token::Eof`].
    pub fn tokenize(&mut self) -> SqlResult<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.position;
            if self.is_at_end() {
                tokens.push(Spanned { token: Token::Eof, position });
                return Ok(tokens);
            }
            let token = self.next_token()?;
            tokens.push(Spanned { token, position });
        }
    }

    fn next_token(&mut self) -> SqlResult<Token> {
        let ch = self.current_char();
        let symbol = match ch {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '*' => Some(Token::Star),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = symbol {
            self.advance();
            return Ok(token);
        }

        match ch {
            c if c.is_alphabetic() || c == '_' => Ok(self.read_word()),
            c if c.is_ascii_digit() => self.read_number(),
            '-' | '+' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '\'' | '"' => self.read_string(ch),
            _ => Err(SqlError::parse(self.position, format!("unexpected character {:?}", ch))),
        }
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while !self.is_at_end() {
            let c = self.current_char();
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            word.push(c);
            self.advance();
        }
        match Keyword::lookup(&word) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Ident(word),
        }
    }

    fn read_number(&mut self) -> SqlResult<Token> {
        let start = self.position;
        let mut number = String::new();
        if matches!(self.current_char(), '-' | '+') {
            number.push(self.current_char());
            self.advance();
        }
        let mut has_dot = false;
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_ascii_digit() {
                number.push(c);
            } else if c == '.' && !has_dot {
                has_dot = true;
                number.push(c);
            } else {
                break;
            }
            self.advance();
        }
        if !self.is_at_end() && (self.current_char() == '.' || self.current_char().is_alphabetic())
        {
            return Err(SqlError::parse(
                start,
                format!("malformed number starting with '{}'", number),
            ));
        }
        Ok(Token::Number(number))
    }

    /// Quoted literal; the quote character doubled stands for itself.
    fn read_string(&mut self, quote: char) -> SqlResult<Token> {
        let start = self.position;
        self.advance();
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(SqlError::parse(start, "unterminated string literal"));
            }
            let c = self.current_char();
            self.advance();
            if c == quote {
                if !self.is_at_end() && self.current_char() == quote {
                    value.push(quote);
                    self.advance();
                    continue;
                }
                return Ok(Token::String(value));
            }
            value.push(c);
        }
    }
}
