//! Tracing instrumentation for the record store.
//!
//! Follows OpenTelemetry semantic conventions for database operations:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//!
//! **Span naming**: `{db.operation.name} {target}`
//! - Example: `select students`, `insert students`, `delete students`
//!
//! **Required attributes**:
//! - `db.system.name`: Always `"sqlite"`
//!
//! **Conditionally required**:
//! - `db.collection.name`: Table name
//! - `db.operation.name`: Operation type (select, insert, update, ...)
//!
//! # Example
//!
//! ```rust,ignore
//! use student_records::otel::{db_span, DbOperation};
//!
//! let span = db_span(DbOperation::Select, Some("students"));
//! let _guard = span.entered();
//! ```

pub mod db;

pub use db::{db_span, record_db_metrics, DbOperation};
