//! Student records demo
//!
//! Declares the `students` schema on an in-memory backend and walks through
//! bulk insert, projections, ordering, limit, count, filtering, update and
//! delete, printing each result.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use std::io::{self, Write};
use student_records::query::{Expr, Order, Predicate};
use student_records::{Assignment, Config, Database, EnrolledDefault, Model, NewStudent, Student};
use tracing_subscriber::{fmt, EnvFilter};

/// Student records demo - schema, constraints, queries, update and delete
///
/// Settings come from STUDENTS_DATABASE_URL and STUDENTS_ENROLLED_DEFAULT;
/// flags override them.
#[derive(Parser)]
#[command(name = "student-records")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend connection string (default: sqlite::memory:)
    #[arg(long)]
    database_url: Option<String>,

    /// How enrolled_date is filled: shared (one timestamp at schema load) or per-insert
    #[arg(long)]
    enrolled_default: Option<EnrolledDefault>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env().context("invalid environment configuration")?;
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(policy) = self.enrolled_default {
            config.enrolled_default = policy;
        }
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("invalid date {}-{}-{}", year, month, day))
}

/// `[a, b, c]`
fn list<T: std::fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = cli.config()?;
    let mut db = Database::open_students(&config).context("failed to open database")?;
    db.create_all().context("failed to create schema")?;

    let stdout = io::stdout();
    run(&mut db, &mut stdout.lock())
}

/// Walk through the demo sequence against a freshly created schema.
fn run(db: &mut Database, out: &mut impl Write) -> Result<()> {
    let albert_einstein = NewStudent::new(
        "Albert Einstein",
        "albert.einstein@zurich.edu",
        6,
        midnight(1879, 3, 14)?,
    );
    let alan_turing = NewStudent::new(
        "Alan Turing",
        "alan.turing@sherborne.edu",
        11,
        midnight(1912, 6, 23)?,
    );

    // Bulk insert, then commit
    let mut session = db.session()?;
    let inserted: Vec<Student> = session.bulk_insert::<Student>(&[albert_einstein, alan_turing])?;
    session.commit()?;
    for student in &inserted {
        writeln!(out, "New student ID is {}.", student.id)?;
    }

    let mut session = db.session()?;

    // All rows
    let students: Vec<Student> = session.all(&Student::query())?;
    writeln!(out, "{}", list(&students))?;

    // Selected columns
    let names = session.rows(&Student::query().select(["name"]))?;
    writeln!(out, "{}", list(&names))?;

    // Ordered by name
    let by_name = session.rows(
        &Student::query()
            .select(["name"])
            .order_by("name", Order::Asc),
    )?;
    writeln!(out, "{}", list(&by_name))?;

    // Ordered by grade, descending
    let by_grade_desc = session.rows(
        &Student::query()
            .select(["name", "grade"])
            .order_by("grade", Order::Desc),
    )?;
    writeln!(out, "{}", list(&by_grade_desc))?;

    // Latest birthday: descending order, first row only
    let latest_birthday = session.rows(
        &Student::query()
            .select(["name", "birthday"])
            .order_by("birthday", Order::Desc)
            .limit(1),
    )?;
    writeln!(out, "{}", list(&latest_birthday))?;

    // Count of ids
    let student_count = session.count(&Student::query().select(["id"]))?;
    writeln!(out, "({},)", student_count)?;

    // Filtering
    let filter_query = Student::query()
        .filter(Predicate::like("name", "%Alan%"))
        .filter(Predicate::eq("grade", 11));
    for record in session.all::<Student>(&filter_query)? {
        writeln!(out, "{}", record.name)?;
    }

    // Update every row
    session.update(
        &Student::query(),
        &[Assignment::set("grade", Expr::column("grade") + 1)],
    )?;
    let grades = session.rows(&Student::query().select(["name", "grade"]))?;
    writeln!(out, "{}", list(&grades))?;

    // Delete the first match, commit, then look again
    let query = Student::query().filter(Predicate::eq("name", "Albert Einstein"));
    if let Some(albert) = session.first::<Student>(&query)? {
        session.delete(&albert)?;
    }
    session.commit()?;

    let session = db.session()?;
    let albert_einstein = session.first::<Student>(&query)?;
    match albert_einstein {
        Some(student) => writeln!(out, "{}", student)?,
        None => writeln!(out, "None")?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_output(config: &Config) -> Vec<String> {
        let mut db = Database::open_students(config).unwrap();
        db.create_all().unwrap();
        let mut out = Vec::new();
        run(&mut db, &mut out).unwrap();
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_demo_sequence() {
        let lines = demo_output(&Config::default());

        assert_eq!(lines[0], "New student ID is 1.");
        assert_eq!(lines[1], "New student ID is 2.");
        assert_eq!(
            lines[2],
            "[Student 1: Albert Einstein, Grade 6, Student 2: Alan Turing, Grade 11]"
        );
        assert_eq!(lines[4], "[('Alan Turing',), ('Albert Einstein',)]");
        assert_eq!(lines[5], "[('Alan Turing', 11), ('Albert Einstein', 6)]");
        assert!(lines[6].starts_with("[('Alan Turing', '1912-06-23"));
        assert_eq!(lines[7], "(2,)");
        assert_eq!(lines[8], "Alan Turing");
        assert!(lines[9].contains("('Alan Turing', 12)"));
        assert!(lines[9].contains("('Albert Einstein', 7)"));
        assert_eq!(lines.last().map(String::as_str), Some("None"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_flags_override_environment_defaults() {
        let cli = Cli::parse_from([
            "student-records",
            "--database-url",
            ":memory:",
            "--enrolled-default",
            "per-insert",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.database_url, ":memory:");
        assert_eq!(config.enrolled_default, EnrolledDefault::PerInsert);
    }
}
