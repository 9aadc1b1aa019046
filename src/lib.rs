//! Student records - typed record store over embedded SQLite.
//!
//! Schemas are plain values, queries are immutable specifications, and every
//! read or write runs inside a [`Session`] transaction. Constraint enforcement
//! (primary key, uniqueness, range checks) is left to the backend.
//!
//! ```rust,no_run
//! use student_records::query::{Expr, Predicate};
//! use student_records::{Assignment, Config, Database, Model, NewStudent, Student};
//! use chrono::NaiveDate;
//!
//! # fn main() -> student_records::Result<()> {
//! let mut db = Database::open_students(&Config::default())?;
//! db.create_all()?;
//!
//! let born = NaiveDate::from_ymd_opt(1912, 6, 23).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut session = db.session()?;
//! let inserted: Vec<Student> = session.bulk_insert::<Student>(&[
//!     NewStudent::new("Alan Turing", "alan.turing@sherborne.edu", 11, born),
//! ])?;
//! session.update(&Student::query(), &[Assignment::set("grade", Expr::column("grade") + 1)])?;
//! let alan: Option<Student> = session.first(&Student::query().filter(Predicate::eq("id", inserted[0].id)))?;
//! session.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod otel;
pub mod query;
pub mod schema;
pub mod types;

// Re-export main types
pub use config::{Backend, Config, EnrolledDefault};
pub use database::{Database, Session};
pub use query::{Aggregate, Assignment, Expr, Order, Predicate, Query};
pub use schema::{students_schema, TableSchema};
pub use types::{ConstraintKind, DatabaseError, Model, NewStudent, Result, Row, Student};
