//! Student entity.

use super::{format_timestamp, Model};
use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table holding students.
pub const STUDENTS_TABLE: &str = "students";

/// Student not yet written to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: NaiveDateTime,

    /// Explicit enrollment time; `None` takes the schema default
    #[serde(default)]
    pub enrolled_date: Option<NaiveDateTime>,
}

impl NewStudent {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        }
    }

    /// Set an explicit enrollment time.
    pub fn enrolled_on(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }
}

/// Persisted student row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: NaiveDateTime,
    pub enrolled_date: NaiveDateTime,
}

impl Model for Student {
    const TABLE: &'static str = STUDENTS_TABLE;
    type New = NewStudent;

    fn insert_values(new: &NewStudent) -> Vec<(&'static str, SqlValue)> {
        let mut values = vec![
            ("name", SqlValue::Text(new.name.clone())),
            ("email", SqlValue::Text(new.email.clone())),
            ("grade", SqlValue::Integer(new.grade)),
            ("birthday", SqlValue::Text(format_timestamp(&new.birthday))),
        ];
        if let Some(enrolled) = &new.enrolled_date {
            values.push(("enrolled_date", SqlValue::Text(format_timestamp(enrolled))));
        }
        values
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            grade: row.get("grade")?,
            birthday: row.get("birthday")?,
            enrolled_date: row.get("enrolled_date")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Student {}: {}, Grade {}", self.id, self.name, self.grade)
    }
}
