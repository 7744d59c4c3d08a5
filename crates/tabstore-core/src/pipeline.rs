//! Post-filter stage: ordering and limiting, or aggregate reduction.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::schema::Row;

/// Column name that stands for "all columns" in `COUNT(*)`.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Asc }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
}

impl AggregateFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggregateFunc,
    /// Column name, or [`WILDCARD`]
    pub column: String,
}

impl Aggregate {
    pub fn count() -> Self {
        Self { func: AggregateFunc::Count, column: WILDCARD.to_string() }
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self { func: AggregateFunc::Sum, column: column.into() }
    }

    pub fn avg(column: impl Into<String>) -> Self {
        Self { func: AggregateFunc::Avg, column: column.into() }
    }

    pub fn is_wildcard(&self) -> bool {
        self.column == WILDCARD
    }
}

/// What happens to the filtered rows. Aggregation and ordering/limiting
/// are exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryShape {
    Rows {
        order_by: Option<OrderBy>,
        limit: Option<usize>,
    },
    Aggregate(Aggregate),
}

impl Default for QueryShape {
    fn default() -> Self {
        QueryShape::Rows { order_by: None, limit: None }
    }
}

/// Scalar produced by an aggregate query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    Count(usize),
    Number(f64),
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Count(n) => write!(f, "{}", n),
            AggregateValue::Number(x) => write!(f, "{:.2}", x),
        }
    }
}

/// Rows plus the schema's column order, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order. Missing cells are empty.
    pub fn column_values(&self, column: &str) -> Vec<&str> {
        self.rows
            .iter()
            .map(|r| r.get(column).map(String::as_str).unwrap_or(""))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(ResultSet),
    Scalar(AggregateValue),
}

/// Parse a stored value as a finite number.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Stable sort by one column.
///
/// Numeric comparison is used when every value parses as a number,
/// text comparison otherwise. The mode is fixed for the whole set so the
/// comparator is a total order.
pub fn sort_rows(rows: &mut [Row], order: &OrderBy) {
    let cell = |r: &Row| r.get(&order.column).map(String::as_str).unwrap_or("").to_string();
    let numeric: Option<Vec<f64>> = rows.iter().map(|r| parse_number(&cell(r))).collect();

    let mut keyed: Vec<(usize, Key)> = match numeric {
        Some(nums) => nums.into_iter().map(Key::Number).enumerate().collect(),
        None => rows.iter().map(|r| Key::Text(cell(r))).enumerate().collect(),
    };

    keyed.sort_by(|(_, a), (_, b)| {
        let ord = a.cmp(b);
        match order.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let order: Vec<usize> = keyed.into_iter().map(|(i, _)| i).collect();
    apply_permutation(rows, order);
}

#[derive(Debug)]
enum Key {
    Number(f64),
    Text(String),
}

impl Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            // never mixed: the mode is chosen for the whole set
            (Key::Number(_), Key::Text(_)) => Ordering::Less,
            (Key::Text(_), Key::Number(_)) => Ordering::Greater,
        }
    }
}

fn apply_permutation(rows: &mut [Row], order: Vec<usize>) {
    let mut taken: Vec<Option<Row>> = rows.iter_mut().map(|r| Some(std::mem::take(r))).collect();
    for (slot, src) in rows.iter_mut().zip(order) {
        if let Some(row) = taken[src].take() {
            *slot = row;
        }
    }
}

/// Keep the first `n` rows. `n >= len` is a no-op.
pub fn limit_rows(rows: &mut Vec<Row>, n: usize) {
    rows.truncate(n);
}

/// Collapse the filtered rows to one scalar.
pub fn aggregate(rows: &[Row], agg: &Aggregate) -> Result<AggregateValue> {
    match agg.func {
        AggregateFunc::Count => Ok(AggregateValue::Count(rows.len())),
        AggregateFunc::Sum => Ok(AggregateValue::Number(sum(rows, agg)?)),
        AggregateFunc::Avg => {
            if rows.is_empty() {
                return Ok(AggregateValue::Number(0.0));
            }
            let total = sum(rows, agg)?;
            Ok(AggregateValue::Number(total / rows.len() as f64))
        }
    }
}

fn sum(rows: &[Row], agg: &Aggregate) -> Result<f64> {
    let function = agg.func.name();
    if agg.is_wildcard() {
        return Err(Error::AggregateType {
            function,
            reason: format!("{} requires a column name, not *", function),
        });
    }
    let mut total = 0.0;
    for row in rows {
        let value = row.get(&agg.column).ok_or_else(|| Error::AggregateType {
            function,
            reason: format!("column '{}' not found", agg.column),
        })?;
        let num = parse_number(value).ok_or_else(|| Error::AggregateType {
            function,
            reason: format!("cannot {} non-numeric value '{}'", function, value),
        })?;
        total += num;
    }
    Ok(total)
}

/// Run the post-filter stage over already filtered rows.
pub fn run(mut rows: Vec<Row>, columns: Vec<String>, shape: &QueryShape) -> Result<QueryOutput> {
    match shape {
        QueryShape::Aggregate(agg) => Ok(QueryOutput::Scalar(aggregate(&rows, agg)?)),
        QueryShape::Rows { order_by, limit } => {
            if let Some(order) = order_by {
                sort_rows(&mut rows, order);
            }
            if let Some(n) = limit {
                limit_rows(&mut rows, *n);
            }
            Ok(QueryOutput::Rows(ResultSet { columns, rows }))
        }
    }
}
