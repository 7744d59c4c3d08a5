//! Row filters: equality and LIKE conditions joined by one combinator.
//!
//! A predicate is flat: all of its conditions are joined by the
//! same operator, so there is no precedence to resolve.

use crate::schema::Row;

/// Comparison applied by a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Exact string equality
    Eq,
    /// Anchored wildcard match: `%` any run, `_` one character
    Like,
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self { column: column.into(), op: CompareOp::Eq, value: value.into() }
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { column: column.into(), op: CompareOp::Like, value: pattern.into() }
    }

    /// A column missing from the row compares as the empty string.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.column).map(String::as_str).unwrap_or("");
        match self.op {
            CompareOp::Eq => actual == self.value,
            CompareOp::Like => like_match(actual, &self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// Conditions joined by a single combinator. Empty matches every row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
    pub combinator: Combinator,
}

impl Predicate {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(conditions: Vec<Condition>, combinator: Combinator) -> Self {
        Self { conditions, combinator }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, Combinator::And)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, Combinator::Or)
    }

    /// Single-condition shorthand.
    pub fn single(condition: Condition) -> Self {
        Self::and(vec![condition])
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn evaluate(&self, row: &Row) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::And => self.conditions.iter().all(|c| c.matches(row)),
            Combinator::Or => self.conditions.iter().any(|c| c.matches(row)),
        }
    }

    /// Columns referenced by the conditions, in order of appearance.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.conditions.iter().map(|c| c.column.as_str())
    }
}

/// SQL LIKE over Unicode scalar values.
///
/// Two-pointer scan: on a mismatch, jump back to just after the last `%`
/// and let it absorb one more character. Worst case is O(n * m).
pub fn like_match(value: &str, pattern: &str) -> bool {
    let text: Vec<char> = value.chars().collect();
    let pat: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    // (pattern index after the last '%', text index it was tried at)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pat.len() {
            match pat[p] {
                '%' => {
                    p += 1;
                    backtrack = Some((p, t));
                    continue;
                }
                '_' => {
                    t += 1;
                    p += 1;
                    continue;
                }
                c if c == text[t] => {
                    t += 1;
                    p += 1;
                    continue;
                }
                _ => {}
            }
        }
        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, t));
            }
            None => return false,
        }
    }

    while p < pat.len() && pat[p] == '%' {
        p += 1;
    }
    p == pat.len()
}
