//! Predicate-based filtering for record queries
//!
//! Provides SQL-like predicates that can be combined and rendered into a
//! parameterized `WHERE` clause. Values are JSON and bound as statement
//! parameters, never spliced into SQL text.

use super::to_sql_value;
use crate::schema::{quote_ident, TableSchema};
use crate::types::{DatabaseError, Result};
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate for filtering rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    // Comparison operations
    /// field == value (IS NULL when value is null)
    Eq(String, Value),
    /// field != value (IS NOT NULL when value is null)
    Ne(String, Value),
    /// field > value
    Gt(String, Value),
    /// field >= value
    Gte(String, Value),
    /// field < value
    Lt(String, Value),
    /// field <= value
    Lte(String, Value),

    // Set operations
    /// field IN [values]
    In(String, Vec<Value>),
    /// field NOT IN [values]
    NotIn(String, Vec<Value>),

    // String operations
    /// field LIKE pattern (`%` and `_` wildcards, ASCII case-insensitive)
    Like(String, String),
    /// field CONTAINS substring
    Contains(String, String),
    /// field STARTS WITH prefix
    StartsWith(String, String),
    /// field ENDS WITH suffix
    EndsWith(String, String),

    // Existence checks
    /// field IS NULL
    IsNull(String),
    /// field IS NOT NULL
    NotNull(String),

    // Logical operations
    /// pred1 AND pred2 AND ...
    And(Vec<Predicate>),
    /// pred1 OR pred2 OR ...
    Or(Vec<Predicate>),
    /// NOT pred
    Not(Box<Predicate>),

    // Always true/false (for composition)
    All,
    None,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like(field.into(), pattern.into())
    }

    pub fn contains(field: impl Into<String>, substring: impl Into<String>) -> Self {
        Self::Contains(field.into(), substring.into())
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith(field.into(), prefix.into())
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::EndsWith(field.into(), suffix.into())
    }

    /// Combine with another predicate using AND, flattening nested ANDs.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, other) => Predicate::And(vec![p, other]),
        }
    }

    /// Render as a SQL boolean expression, appending bound values to `params`.
    ///
    /// Every referenced field must be a column of `schema`.
    pub fn to_sql(&self, schema: &TableSchema, params: &mut Vec<SqlValue>) -> Result<String> {
        let sql = match self {
            Predicate::Eq(field, Value::Null) => format!("{} IS NULL", column(schema, field)?),
            Predicate::Ne(field, Value::Null) => {
                format!("{} IS NOT NULL", column(schema, field)?)
            }
            Predicate::Eq(field, value) => compare(schema, field, "=", value, params)?,
            Predicate::Ne(field, value) => compare(schema, field, "!=", value, params)?,
            Predicate::Gt(field, value) => compare(schema, field, ">", value, params)?,
            Predicate::Gte(field, value) => compare(schema, field, ">=", value, params)?,
            Predicate::Lt(field, value) => compare(schema, field, "<", value, params)?,
            Predicate::Lte(field, value) => compare(schema, field, "<=", value, params)?,
            Predicate::In(field, values) | Predicate::NotIn(field, values) => {
                let col = column(schema, field)?;
                let negate = matches!(self, Predicate::NotIn(..));
                if values.is_empty() {
                    // x IN () is false for every row
                    return Ok(if negate { "1" } else { "0" }.to_string());
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().map(to_sql_value));
                format!(
                    "{} {}IN ({})",
                    col,
                    if negate { "NOT " } else { "" },
                    placeholders
                )
            }
            Predicate::Like(field, pattern) => {
                let col = column(schema, field)?;
                params.push(SqlValue::Text(pattern.clone()));
                format!("{} LIKE ?", col)
            }
            Predicate::Contains(field, text) => {
                escaped_like(schema, field, format!("%{}%", escape_like(text)), params)?
            }
            Predicate::StartsWith(field, text) => {
                escaped_like(schema, field, format!("{}%", escape_like(text)), params)?
            }
            Predicate::EndsWith(field, text) => {
                escaped_like(schema, field, format!("%{}", escape_like(text)), params)?
            }
            Predicate::IsNull(field) => format!("{} IS NULL", column(schema, field)?),
            Predicate::NotNull(field) => format!("{} IS NOT NULL", column(schema, field)?),
            Predicate::And(predicates) => join(schema, predicates, " AND ", "1", params)?,
            Predicate::Or(predicates) => join(schema, predicates, " OR ", "0", params)?,
            Predicate::Not(predicate) => format!("NOT ({})", predicate.to_sql(schema, params)?),
            Predicate::All => "1".to_string(),
            Predicate::None => "0".to_string(),
        };
        Ok(sql)
    }
}

/// Quoted column name, checked against the schema.
pub(crate) fn column(schema: &TableSchema, field: &str) -> Result<String> {
    if schema.has_column(field) {
        Ok(quote_ident(field))
    } else {
        Err(DatabaseError::query(format!(
            "unknown column '{}' on table '{}'",
            field, schema.name
        )))
    }
}

fn compare(
    schema: &TableSchema,
    field: &str,
    op: &str,
    value: &Value,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let col = column(schema, field)?;
    params.push(to_sql_value(value));
    Ok(format!("{} {} ?", col, op))
}

fn escaped_like(
    schema: &TableSchema,
    field: &str,
    pattern: String,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let col = column(schema, field)?;
    params.push(SqlValue::Text(pattern));
    Ok(format!("{} LIKE ? ESCAPE '\\'", col))
}

fn join(
    schema: &TableSchema,
    predicates: &[Predicate],
    separator: &str,
    empty: &str,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    if predicates.is_empty() {
        return Ok(empty.to_string());
    }
    let parts = predicates
        .iter()
        .map(|p| p.to_sql(schema, params).map(|sql| format!("({})", sql)))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(separator))
}

/// Escape LIKE wildcards so `text` matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
