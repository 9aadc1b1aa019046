//! Built-in schemas.
//!
//! - `students` - enrolled students with email uniqueness and grade range checks

use super::{ColumnDef, ColumnDefault, ColumnType, Constraint, IndexDef, TableSchema};
use crate::config::EnrolledDefault;
use crate::types::student::STUDENTS_TABLE;
use crate::types::timestamp;

/// Maximum stored email length.
pub const EMAIL_MAX_LEN: u32 = 55;

/// Lowest allowed grade.
pub const GRADE_MIN: i64 = 1;

/// Highest allowed grade.
pub const GRADE_MAX: i64 = 12;

/// Get the `students` table schema.
///
/// # Schema Fields
///
/// - `id` (integer): primary key `id_pk`, assigned by the backend
/// - `name` (text): non-unique index `index_name`
/// - `email` (varchar 55): unique `unique_email`, length checked by `email_max_55`
/// - `grade` (integer): `grade_between_1_and_12`
/// - `birthday` (datetime)
/// - `enrolled_date` (datetime): default chosen by `enrolled_default`
///
/// With [`EnrolledDefault::Shared`] the default timestamp is taken here, once,
/// and every insert without an explicit `enrolled_date` receives that same value.
pub fn students_schema(enrolled_default: EnrolledDefault) -> TableSchema {
    let enrolled = match enrolled_default {
        EnrolledDefault::Shared => {
            ColumnDefault::Value(timestamp(&chrono::Local::now().naive_local()))
        }
        EnrolledDefault::PerInsert => ColumnDefault::Now,
    };

    TableSchema::new(STUDENTS_TABLE)
        .column(ColumnDef::new("id", ColumnType::Integer).not_null())
        .column(ColumnDef::new("name", ColumnType::Text))
        .column(ColumnDef::new("email", ColumnType::VarChar(EMAIL_MAX_LEN)))
        .column(ColumnDef::new("grade", ColumnType::Integer))
        .column(ColumnDef::new("birthday", ColumnType::DateTime))
        .column(ColumnDef::new("enrolled_date", ColumnType::DateTime).with_default(enrolled))
        .constraint(Constraint::primary_key("id_pk", &["id"]))
        .constraint(Constraint::unique("unique_email", &["email"]))
        .constraint(Constraint::check(
            "grade_between_1_and_12",
            format!("grade BETWEEN {} AND {}", GRADE_MIN, GRADE_MAX),
        ))
        .constraint(Constraint::check(
            "email_max_55",
            format!("length(email) <= {}", EMAIL_MAX_LEN),
        ))
        .index(IndexDef::new("index_name", &["name"]))
}
