//! Core types for the record store.

pub mod error;
pub mod model;
pub mod row;
pub mod student;

pub use error::{ConstraintKind, DatabaseError, Result};
pub use model::Model;
pub use row::Row;
pub use student::{NewStudent, Student};

use chrono::NaiveDateTime;

/// Text layout used for DATETIME columns (same as rusqlite's chrono support).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render a timestamp the way it is stored in DATETIME columns.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp as a query value, for predicates on DATETIME columns.
pub fn timestamp(dt: &NaiveDateTime) -> serde_json::Value {
    serde_json::Value::String(format_timestamp(dt))
}
