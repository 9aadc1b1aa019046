//! Error types for record store operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.
//! Backend constraint failures are classified from SQLite's extended result codes so
//! callers can tell a rejected write apart from a broken connection.

use rusqlite::ffi;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Kind of backend constraint that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check,
    NotNull,
    ForeignKey,
    Other,
}

impl ConstraintKind {
    fn from_extended_code(code: i32) -> Self {
        match code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::PrimaryKey,
            ffi::SQLITE_CONSTRAINT_UNIQUE => Self::Unique,
            ffi::SQLITE_CONSTRAINT_CHECK => Self::Check,
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNull,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrimaryKey => "primary key",
            Self::Unique => "unique",
            Self::Check => "check",
            Self::NotNull => "not null",
            Self::ForeignKey => "foreign key",
            Self::Other => "constraint",
        };
        f.write_str(name)
    }
}

/// Error type for all record store operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A write was rejected by a backend constraint.
    ///
    /// `target` is what SQLite reports after "constraint failed:", i.e. the
    /// check constraint name or the `table.column` list of a unique key.
    #[error("{kind} constraint violated ({target}): {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        target: String,
        message: String,
    },

    /// Backend could not be opened
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// Schema definition invalid or incompatible with existing storage
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Schema not registered with the database
    #[error("Schema not registered: {0}")]
    SchemaNotFound(String),

    /// Query specification could not be rendered
    #[error("Query error: {0}")]
    QueryError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Any other SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let message = message.unwrap_or_else(|| code.to_string());
                let target = message
                    .split_once("constraint failed: ")
                    .map(|(_, target)| target.trim().to_string())
                    .unwrap_or_default();
                Self::ConstraintViolation {
                    kind: ConstraintKind::from_extended_code(code.extended_code),
                    target,
                    message,
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

impl DatabaseError {
    /// Create a query error with context.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a schema error with context.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// `true` if the backend rejected a write because of a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    /// Constraint kind, if this is a constraint violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::ConstraintViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
