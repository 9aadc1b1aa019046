//! Database operation spans.

use tracing::{field, span, Level, Span};

/// Database operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOperation {
    /// Open connection
    Connect,
    /// Create tables and indexes
    CreateSchema,
    /// Insert rows
    Insert,
    /// Read rows
    Select,
    /// Aggregate over rows
    Aggregate,
    /// Update rows
    Update,
    /// Delete rows
    Delete,
    /// Commit transaction
    Commit,
    /// Roll back transaction
    Rollback,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::CreateSchema => "create_schema",
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Aggregate => "aggregate",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        }
    }
}

/// Create database operation span with semantic conventions.
///
/// Row counts are declared empty and filled in by [`record_db_metrics`].
pub fn db_span(operation: DbOperation, collection: Option<&str>) -> Span {
    // Span name: "{operation} {collection}" or just "{operation}"
    let span_name = match collection {
        Some(coll) => format!("{} {}", operation.as_str(), coll),
        None => operation.as_str().to_string(),
    };

    span!(
        Level::INFO,
        "db",
        otel.name = %span_name,
        otel.kind = "client",
        db.system.name = "sqlite",
        db.operation.name = operation.as_str(),
        db.collection.name = collection.unwrap_or_default(),
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    )
}

/// Record row counts on the current span.
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<usize>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}
