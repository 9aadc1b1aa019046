//! Integration tests for core record store features.

use chrono::{NaiveDate, NaiveDateTime};
use student_records::query::{Expr, Order, Predicate};
use student_records::{
    Assignment, Config, ConstraintKind, Database, DatabaseError, EnrolledDefault, Model,
    NewStudent, Student,
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn open() -> Database {
    let db = Database::open_students(&Config::default()).unwrap();
    db.create_all().unwrap();
    db
}

fn einstein() -> NewStudent {
    NewStudent::new("Albert Einstein", "albert.einstein@zurich.edu", 6, date(1879, 3, 14))
}

fn turing() -> NewStudent {
    NewStudent::new("Alan Turing", "alan.turing@sherborne.edu", 11, date(1912, 6, 23))
}

/// Fresh database holding Einstein and Turing, committed.
fn seeded() -> (Database, Vec<Student>) {
    let mut db = open();
    let mut session = db.session().unwrap();
    let inserted = session.bulk_insert::<Student>(&[einstein(), turing()]).unwrap();
    session.commit().unwrap();
    (db, inserted)
}

#[test]
fn test_bulk_insert_assigns_distinct_ids() {
    let (mut db, inserted) = seeded();

    assert_eq!(inserted.len(), 2);
    assert_ne!(inserted[0].id, inserted[1].id);
    assert_eq!(inserted[0].name, "Albert Einstein");
    assert_eq!(inserted[1].name, "Alan Turing");

    let session = db.session().unwrap();
    let all: Vec<Student> = session.all(&Student::query()).unwrap();
    assert_eq!(all, inserted);
}

#[test]
fn test_bulk_insert_does_not_touch_input() {
    let mut db = open();
    let batch = vec![einstein(), turing()];
    let mut session = db.session().unwrap();
    session.bulk_insert::<Student>(&batch).unwrap();
    assert_eq!(batch, vec![einstein(), turing()]);
}

#[test]
fn test_select_columns() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();

    let names = session.rows(&Student::query().select(["name"])).unwrap();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|r| r.columns == vec!["name"]));
    let mut rendered: Vec<String> = names.iter().map(ToString::to_string).collect();
    rendered.sort();
    assert_eq!(rendered, vec!["('Alan Turing',)", "('Albert Einstein',)"]);
}

#[test]
fn test_order_by_name() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();

    let rows = session
        .rows(&Student::query().select(["name"]).order_by("name", Order::Asc))
        .unwrap();
    let names: Vec<_> = rows.iter().filter_map(|r| r.get_str("name")).collect();
    assert_eq!(names, vec!["Alan Turing", "Albert Einstein"]);
}

#[test]
fn test_order_by_grade_desc() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();

    let rows = session
        .rows(
            &Student::query()
                .select(["name", "grade"])
                .order_by("grade", Order::Desc),
        )
        .unwrap();
    let rendered: Vec<String> = rows.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["('Alan Turing', 11)", "('Albert Einstein', 6)"]
    );
}

#[test]
fn test_order_desc_limit_returns_maximum() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();

    let rows = session
        .rows(
            &Student::query()
                .select(["name", "birthday"])
                .order_by("birthday", Order::Desc)
                .limit(1),
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("name"), Some("Alan Turing"));
    assert_eq!(rows[0].get_str("birthday"), Some("1912-06-23 00:00:00"));
}

#[test]
fn test_count() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();
    assert_eq!(session.count(&Student::query().select(["id"])).unwrap(), 2);
    assert_eq!(session.count(&Student::query()).unwrap(), 2);
}

#[test]
fn test_filter_like_and_equality() {
    let (mut db, _) = seeded();
    let mut session = db.session().unwrap();
    session
        .insert::<Student>(NewStudent::new(
            "Alan Kay",
            "alan.kay@parc.com",
            9,
            date(1940, 5, 17),
        ))
        .unwrap();

    let query = Student::query()
        .filter(Predicate::like("name", "%Alan%"))
        .filter(Predicate::eq("grade", 11));
    let matches: Vec<Student> = session.all(&query).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Alan Turing");
    assert_eq!(matches[0].grade, 11);

    let alans = session
        .count(&Student::query().filter(Predicate::contains("name", "Alan")))
        .unwrap();
    assert_eq!(alans, 2);
}

#[test]
fn test_update_then_delete_then_absent() {
    let (mut db, inserted) = seeded();
    let turing_id = inserted[1].id;

    let mut session = db.session().unwrap();
    let changed = session
        .update(
            &Student::query(),
            &[Assignment::set("grade", Expr::column("grade") + 1)],
        )
        .unwrap();
    assert_eq!(changed, 2);

    let turing: Student = session.get(turing_id).unwrap().unwrap();
    assert_eq!(turing.grade, 12);

    let query = Student::query().filter(Predicate::eq("name", "Alan Turing"));
    let found: Student = session.first(&query).unwrap().unwrap();
    assert!(session.delete(&found).unwrap());
    assert!(!session.delete(&found).unwrap());
    session.commit().unwrap();

    let session = db.session().unwrap();
    assert!(session.first::<Student>(&query).unwrap().is_none());
    assert_eq!(session.count(&Student::query()).unwrap(), 1);
}

#[test]
fn test_update_past_grade_limit_rejected() {
    let (mut db, _) = seeded();
    let mut session = db.session().unwrap();

    // Turing is at 11: +2 would leave the allowed range
    let err = session
        .update(
            &Student::query(),
            &[Assignment::set("grade", Expr::column("grade") + 2)],
        )
        .unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Check));

    let grades = session
        .rows(&Student::query().select(["grade"]).order_by("grade", Order::Asc))
        .unwrap();
    let grades: Vec<_> = grades.iter().filter_map(|r| r.get_i64("grade")).collect();
    assert_eq!(grades, vec![6, 11]);
}

#[test]
fn test_filtered_update_only_touches_matches() {
    let (mut db, _) = seeded();
    let mut session = db.session().unwrap();

    let changed = session
        .update(
            &Student::query().filter(Predicate::eq("name", "Albert Einstein")),
            &[Assignment::set("grade", 7)],
        )
        .unwrap();
    assert_eq!(changed, 1);

    let turing: Student = session
        .first(&Student::query().filter(Predicate::eq("name", "Alan Turing")))
        .unwrap()
        .unwrap();
    assert_eq!(turing.grade, 11);
}

#[test]
fn test_duplicate_email_rejected() {
    let (mut db, _) = seeded();
    let mut session = db.session().unwrap();

    let duplicate = NewStudent::new("Impostor", "alan.turing@sherborne.edu", 5, date(1950, 1, 1));
    let err = session.insert::<Student>(duplicate).unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    assert!(err.to_string().contains("students.email"));

    let original: Option<Student> = session
        .first(&Student::query().filter(Predicate::eq("email", "alan.turing@sherborne.edu")))
        .unwrap();
    assert_eq!(original.map(|s| s.name), Some("Alan Turing".to_string()));
}

#[test]
fn test_failed_batch_leaves_no_rows() {
    let mut db = open();
    let mut session = db.session().unwrap();

    let bad = NewStudent::new("Too Old", "old@example.edu", 13, date(1900, 1, 1));
    let err = session
        .bulk_insert::<Student>(&[einstein(), bad, turing()])
        .unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(session.count(&Student::query()).unwrap(), 0);

    // The session is still usable after the failed batch
    session.bulk_insert::<Student>(&[einstein()]).unwrap();
    assert_eq!(session.count(&Student::query()).unwrap(), 1);
}

#[test]
fn test_long_email_rejected() {
    let mut db = open();
    let mut session = db.session().unwrap();

    let email = format!("{}@example.edu", "a".repeat(50));
    let err = session
        .insert::<Student>(NewStudent::new("Long", email, 5, date(2000, 1, 1)))
        .unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Check));
}

#[test]
fn test_rollback_discards_writes() {
    let mut db = open();

    let mut session = db.session().unwrap();
    session.bulk_insert::<Student>(&[einstein(), turing()]).unwrap();
    assert_eq!(session.count(&Student::query()).unwrap(), 2);
    session.rollback().unwrap();

    let session = db.session().unwrap();
    assert_eq!(session.count(&Student::query()).unwrap(), 0);
}

#[test]
fn test_dropped_session_rolls_back() {
    let mut db = open();
    {
        let mut session = db.session().unwrap();
        session.bulk_insert::<Student>(&[einstein()]).unwrap();
    }
    let session = db.session().unwrap();
    assert_eq!(session.count(&Student::query()).unwrap(), 0);
}

#[test]
fn test_delete_where() {
    let (mut db, _) = seeded();
    let mut session = db.session().unwrap();
    let removed = session
        .delete_where(&Student::query().filter(Predicate::lt("grade", 10)))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(session.count(&Student::query()).unwrap(), 1);
}

#[test]
fn test_unknown_column_is_query_error() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();
    let err = session
        .rows(&Student::query().select(["nickname"]))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::QueryError(_)));
}

#[test]
fn test_file_backend_persists_commits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("students.db");
    let config = Config::new(format!("sqlite:///{}", path.display()));

    {
        let mut db = Database::open_students(&config).unwrap();
        db.create_all().unwrap();
        let mut session = db.session().unwrap();
        session.bulk_insert::<Student>(&[einstein(), turing()]).unwrap();
        session.commit().unwrap();
        db.close().unwrap();
    }

    let mut db = Database::open_students(&config).unwrap();
    db.create_all().unwrap();
    let session = db.session().unwrap();
    assert_eq!(session.count(&Student::query()).unwrap(), 2);
}

#[test]
fn test_per_insert_enrolled_default() {
    let config = Config::default().with_enrolled_default(EnrolledDefault::PerInsert);
    let mut db = Database::open_students(&config).unwrap();
    db.create_all().unwrap();

    let before = chrono::Local::now().naive_local();
    let mut session = db.session().unwrap();
    let student: Student = session.insert(einstein()).unwrap();
    let after = chrono::Local::now().naive_local();

    assert!(student.enrolled_date >= before && student.enrolled_date <= after);
}

#[test]
fn test_first_respects_zero_limit() {
    let (mut db, _) = seeded();
    let session = db.session().unwrap();

    assert!(session.first::<Student>(&Student::query().limit(0)).unwrap().is_none());
    assert!(session.first::<Student>(&Student::query().limit(5)).unwrap().is_some());
}

#[test]
fn test_missing_directory_is_connection_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("students.db");
    let config = Config::new(format!("sqlite:///{}", path.display()));

    let err = Database::open_students(&config).err().unwrap();
    assert!(matches!(err, DatabaseError::ConnectionError(_)), "{err:?}");
}

#[test]
fn test_non_database_file_is_connection_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("junk.db");
    std::fs::write(&path, vec![0x5a_u8; 4096]).unwrap();
    let config = Config::new(format!("sqlite:///{}", path.display()));

    let err = Database::open_students(&config).err().unwrap();
    assert!(matches!(err, DatabaseError::ConnectionError(_)), "{err:?}");
}
