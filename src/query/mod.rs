//! Query specification values.
//!
//! A [`Query`] is an immutable description of a read (or of the target set of an
//! update/delete): projection, predicate, ordering, limit and offset. Builder
//! methods consume and return the value; nothing is executed until a
//! [`Session`](crate::Session) method receives it.
//!
//! ```rust
//! use student_records::query::{Order, Predicate, Query};
//!
//! let query = Query::new("students")
//!     .select(["name", "grade"])
//!     .filter(Predicate::like("name", "%Alan%"))
//!     .filter(Predicate::eq("grade", 11))
//!     .order_by("grade", Order::Desc)
//!     .limit(10);
//! assert_eq!(query.limit, Some(10));
//! ```

pub mod expr;
pub mod predicates;
pub mod sql;

pub use expr::{ArithOp, Assignment, Expr};
pub use predicates::Predicate;

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort order for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Aggregate function over one column (or all rows for `Count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl Aggregate {
    pub fn as_sql(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
        }
    }
}

/// Query over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    /// Projected columns; empty selects every schema column
    pub columns: Vec<String>,
    pub predicate: Predicate,
    /// Applied in order: first entry is the primary sort key
    pub order_by: Vec<(String, Order)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    /// Create a new query with no filters (matches all)
    pub fn new(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            columns: Vec::new(),
            predicate: Predicate::All,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Project only the named columns, in the given order.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a filter predicate (combines with existing filters using AND)
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }

    /// Append an ordering key.
    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    /// Limit the number of results (applied after ordering)
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first N results (for pagination)
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// `true` if ordering, limit or offset is set.
    pub fn is_windowed(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some()
    }
}

/// Convert a JSON value into a bound statement parameter.
///
/// Booleans become 0/1; arrays and objects are stored as JSON text.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
