//! Table schema definitions and DDL rendering.
//!
//! A [`TableSchema`] is a plain value handed to [`Database::open`](crate::Database::open);
//! there is no process-wide registry. Constraints and indexes are rendered into
//! SQLite DDL and enforced by the backend at write time.

pub mod builtin;

pub use builtin::students_schema;

use crate::types::{format_timestamp, DatabaseError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Logical column types.
///
/// - `Integer` -> INTEGER
/// - `Real` -> REAL
/// - `Text` -> TEXT
/// - `VarChar(n)` -> VARCHAR(n) (length is not enforced by SQLite; pair it with a check)
/// - `DateTime` -> DATETIME (stored as `YYYY-MM-DD HH:MM:SS[.ffffff]` text)
/// - `Boolean` -> BOOLEAN (0/1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    VarChar(u32),
    DateTime,
    Boolean,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`.
    pub fn to_sql_type(self) -> String {
        match self {
            Self::Integer => "INTEGER".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Text => "TEXT".to_string(),
            Self::VarChar(n) => format!("VARCHAR({})", n),
            Self::DateTime => "DATETIME".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
        }
    }
}

/// Client-side default applied when an insert leaves a column out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDefault {
    /// Fixed value, computed once when the schema was built
    Value(Value),
    /// Local time at the moment of each insert
    Now,
}

impl ColumnDefault {
    /// Resolve to the value written for one insert.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Now => Value::String(format_timestamp(&chrono::Local::now().naive_local())),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<ColumnDefault>,
}

impl ColumnDef {
    /// Nullable column without default.
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    fn to_sql(&self) -> String {
        let mut def = format!("{} {}", quote_ident(&self.name), self.col_type.to_sql_type());
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

/// Named table constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    PrimaryKey { name: String, columns: Vec<String> },
    Unique { name: String, columns: Vec<String> },
    /// Raw SQL boolean expression, e.g. `grade BETWEEN 1 AND 12`
    Check { name: String, expr: String },
}

impl Constraint {
    pub fn primary_key(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::PrimaryKey {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::Unique {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn check(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::Check {
            name: name.into(),
            expr: expr.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::PrimaryKey { name, .. } | Self::Unique { name, .. } | Self::Check { name, .. } => {
                name
            }
        }
    }

    fn columns(&self) -> &[String] {
        match self {
            Self::PrimaryKey { columns, .. } | Self::Unique { columns, .. } => columns,
            Self::Check { .. } => &[],
        }
    }

    fn to_sql(&self) -> String {
        let name = quote_ident(self.name());
        match self {
            Self::PrimaryKey { columns, .. } => {
                format!("CONSTRAINT {} PRIMARY KEY ({})", name, quote_list(columns))
            }
            Self::Unique { columns, .. } => {
                format!("CONSTRAINT {} UNIQUE ({})", name, quote_list(columns))
            }
            Self::Check { expr, .. } => format!("CONSTRAINT {} CHECK ({})", name, expr),
        }
    }
}

/// Secondary index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    /// Non-unique index.
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    /// Index that also rejects duplicate keys.
    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }
}

/// Table definition: columns, constraints and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Single-column primary key, if declared.
    pub fn primary_key(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::PrimaryKey { columns, .. } if columns.len() == 1 => {
                Some(columns[0].as_str())
            }
            _ => None,
        })
    }

    /// Check names, column references and primary key count.
    pub fn validate(&self) -> Result<()> {
        check_ident(&self.name)?;

        if self.columns.is_empty() {
            return Err(DatabaseError::schema(format!(
                "table '{}' must have at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            check_ident(&col.name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(DatabaseError::schema(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, self.name
                )));
            }
        }

        let mut primary_keys = 0;
        for constraint in &self.constraints {
            check_ident(constraint.name())?;
            if matches!(constraint, Constraint::PrimaryKey { .. }) {
                primary_keys += 1;
            }
            if matches!(constraint, Constraint::PrimaryKey { .. } | Constraint::Unique { .. })
                && constraint.columns().is_empty()
            {
                return Err(DatabaseError::schema(format!(
                    "constraint '{}' names no columns",
                    constraint.name()
                )));
            }
            self.check_columns(constraint.name(), constraint.columns())?;
        }
        if primary_keys > 1 {
            return Err(DatabaseError::schema(format!(
                "table '{}' declares more than one primary key",
                self.name
            )));
        }

        for index in &self.indexes {
            check_ident(&index.name)?;
            if index.columns.is_empty() {
                return Err(DatabaseError::schema(format!(
                    "index '{}' names no columns",
                    index.name
                )));
            }
            self.check_columns(&index.name, &index.columns)?;
        }

        Ok(())
    }

    fn check_columns(&self, owner: &str, columns: &[String]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(DatabaseError::schema(format!(
                "'{}' references unknown column '{}' in table '{}'",
                owner, missing, self.name
            ))),
            None => Ok(()),
        }
    }

    /// `CREATE TABLE` statement with every column and constraint.
    pub fn create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::to_sql).collect();
        parts.extend(self.constraints.iter().map(Constraint::to_sql));
        format!("CREATE TABLE {} ({})", quote_ident(&self.name), parts.join(", "))
    }

    /// One `CREATE INDEX` statement per index.
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                    if index.unique { "UNIQUE " } else { "" },
                    quote_ident(&index.name),
                    quote_ident(&self.name),
                    quote_list(&index.columns)
                )
            })
            .collect()
    }
}

fn ident_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

fn check_ident(name: &str) -> Result<()> {
    if ident_pattern().is_match(name) {
        Ok(())
    } else {
        Err(DatabaseError::schema(format!("invalid identifier '{}'", name)))
    }
}

/// Double-quote an identifier for SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}
