//! Mapping between Rust record types and backend tables.

use crate::query::Query;
use rusqlite::types::Value as SqlValue;

/// A record type persisted in one table.
///
/// `New` is the unpersisted form (no id). Inserting a `New` yields a fresh
/// `Self` read back from the backend; the input is never mutated.
pub trait Model: Sized {
    /// Backend table name
    const TABLE: &'static str;

    /// Unpersisted form of the record
    type New;

    /// Column values to write for a new record.
    ///
    /// Columns left out are filled from the schema's column defaults.
    fn insert_values(new: &Self::New) -> Vec<(&'static str, SqlValue)>;

    /// Build a record from a row holding every schema column.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// Backend-assigned primary key.
    fn id(&self) -> i64;

    /// Unfiltered query over this model's table.
    fn query() -> Query {
        Query::new(Self::TABLE)
    }
}
