//! Rendering of query values into parameterized SQLite statements.

use super::predicates::column;
use super::{Aggregate, Assignment, Query};
use crate::schema::{quote_ident, TableSchema};
use crate::types::{DatabaseError, Result};
use rusqlite::types::Value as SqlValue;

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Columns a query returns: the projection, or every schema column.
pub fn projected_columns(query: &Query, schema: &TableSchema) -> Result<Vec<String>> {
    if query.columns.is_empty() {
        return Ok(schema.column_names());
    }
    for name in &query.columns {
        column(schema, name)?;
    }
    Ok(query.columns.clone())
}

/// `SELECT cols FROM table WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn select(query: &Query, schema: &TableSchema) -> Result<Statement> {
    check_table(query, schema)?;
    let columns = projected_columns(query, schema)?;
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM {}", column_list, quote_ident(&schema.name));
    push_where(&mut sql, query, schema, &mut params)?;
    push_window(&mut sql, query, schema)?;
    Ok(Statement { sql, params })
}

/// `SELECT AGG(col) FROM ...`.
///
/// Without a column only `Count` is allowed and counts rows. When the query is
/// limited, the aggregate runs over the limited row set.
pub fn aggregate(
    query: &Query,
    schema: &TableSchema,
    function: Aggregate,
    target: Option<&str>,
) -> Result<Statement> {
    check_table(query, schema)?;
    let target = match target {
        Some(name) => column(schema, name)?,
        None if function == Aggregate::Count => "*".to_string(),
        None => {
            return Err(DatabaseError::query(format!(
                "{} needs a column",
                function.as_sql()
            )))
        }
    };

    let mut params = Vec::new();
    let sql = if query.limit.is_some() || query.offset.is_some() {
        let mut inner = format!("SELECT * FROM {}", quote_ident(&schema.name));
        push_where(&mut inner, query, schema, &mut params)?;
        push_window(&mut inner, query, schema)?;
        format!("SELECT {}({}) FROM ({})", function.as_sql(), target, inner)
    } else {
        let mut sql = format!(
            "SELECT {}({}) FROM {}",
            function.as_sql(),
            target,
            quote_ident(&schema.name)
        );
        push_where(&mut sql, query, schema, &mut params)?;
        sql
    };
    Ok(Statement { sql, params })
}

/// `UPDATE table SET col = expr, ... WHERE ...`
pub fn update(query: &Query, schema: &TableSchema, assignments: &[Assignment]) -> Result<Statement> {
    check_table(query, schema)?;
    check_unwindowed(query, "update")?;
    if assignments.is_empty() {
        return Err(DatabaseError::query("update needs at least one assignment"));
    }

    let mut params = Vec::new();
    let mut sets = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let target = column(schema, &assignment.column)?;
        let value = assignment.value.to_sql(schema, &mut params)?;
        sets.push(format!("{} = {}", target, value));
    }

    let mut sql = format!("UPDATE {} SET {}", quote_ident(&schema.name), sets.join(", "));
    push_where(&mut sql, query, schema, &mut params)?;
    Ok(Statement { sql, params })
}

/// `DELETE FROM table WHERE ...`
pub fn delete(query: &Query, schema: &TableSchema) -> Result<Statement> {
    check_table(query, schema)?;
    check_unwindowed(query, "delete")?;

    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {}", quote_ident(&schema.name));
    push_where(&mut sql, query, schema, &mut params)?;
    Ok(Statement { sql, params })
}

/// `INSERT INTO table (cols) VALUES (?, ...) RETURNING <every column>`
pub fn insert(schema: &TableSchema, columns: &[&str]) -> Result<String> {
    if columns.is_empty() {
        return Err(DatabaseError::query("insert needs at least one column"));
    }
    let targets = columns
        .iter()
        .map(|c| column(schema, c))
        .collect::<Result<Vec<_>>>()?;
    let returning = schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote_ident(&schema.name),
        targets.join(", "),
        vec!["?"; columns.len()].join(", "),
        returning.join(", ")
    ))
}

fn check_table(query: &Query, schema: &TableSchema) -> Result<()> {
    if query.table == schema.name {
        Ok(())
    } else {
        Err(DatabaseError::query(format!(
            "query targets '{}' but schema is '{}'",
            query.table, schema.name
        )))
    }
}

fn check_unwindowed(query: &Query, operation: &str) -> Result<()> {
    if query.is_windowed() {
        Err(DatabaseError::query(format!(
            "{} does not support ordering, limit or offset",
            operation
        )))
    } else {
        Ok(())
    }
}

fn push_where(
    sql: &mut String,
    query: &Query,
    schema: &TableSchema,
    params: &mut Vec<SqlValue>,
) -> Result<()> {
    if matches!(query.predicate, super::Predicate::All) {
        return Ok(());
    }
    let clause = query.predicate.to_sql(schema, params)?;
    sql.push_str(" WHERE ");
    sql.push_str(&clause);
    Ok(())
}

fn push_window(sql: &mut String, query: &Query, schema: &TableSchema) -> Result<()> {
    if !query.order_by.is_empty() {
        let keys = query
            .order_by
            .iter()
            .map(|(field, order)| Ok(format!("{} {}", column(schema, field)?, order.as_sql())))
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
    // SQLite takes a signed 64-bit window; larger values mean "no bound"
    let clamp = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    match (query.limit.map(clamp), query.offset.map(clamp)) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Expr, Order, Predicate};
    use crate::schema::{ColumnDef, ColumnType};

    fn schema() -> TableSchema {
        TableSchema::new("students")
            .column(ColumnDef::new("id", ColumnType::Integer))
            .column(ColumnDef::new("name", ColumnType::Text))
            .column(ColumnDef::new("grade", ColumnType::Integer))
    }

    #[test]
    fn test_select_all_columns() {
        let stmt = select(&Query::new("students"), &schema()).unwrap();
        assert_eq!(stmt.sql, "SELECT \"id\", \"name\", \"grade\" FROM \"students\"");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_projection_order_limit() {
        let query = Query::new("students")
            .select(["name", "grade"])
            .order_by("grade", Order::Desc)
            .order_by("name", Order::Asc)
            .limit(1);
        let stmt = select(&query, &schema()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"name\", \"grade\" FROM \"students\" ORDER BY \"grade\" DESC, \"name\" ASC LIMIT 1"
        );
    }

    #[test]
    fn test_select_with_filter() {
        let query = Query::new("students")
            .filter(Predicate::like("name", "%Alan%"))
            .filter(Predicate::eq("grade", 11));
        let stmt = select(&query, &schema()).unwrap();
        assert!(stmt
            .sql
            .ends_with("WHERE (\"name\" LIKE ?) AND (\"grade\" = ?)"));
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = select(&Query::new("students").offset(5), &schema()).unwrap();
        assert!(stmt.sql.ends_with("LIMIT -1 OFFSET 5"));
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let query = Query::new("students").limit(usize::MAX).offset(usize::MAX);
        let stmt = select(&query, &schema()).unwrap();
        assert!(stmt.sql.ends_with(&format!("LIMIT {0} OFFSET {0}", i64::MAX)));
    }

    #[test]
    fn test_unknown_projection_rejected() {
        let query = Query::new("students").select(["email"]);
        assert!(select(&query, &schema()).is_err());
    }

    #[test]
    fn test_wrong_table_rejected() {
        assert!(select(&Query::new("teachers"), &schema()).is_err());
    }

    #[test]
    fn test_count_rows_and_column() {
        let stmt = aggregate(&Query::new("students"), &schema(), Aggregate::Count, None).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM \"students\"");

        let stmt =
            aggregate(&Query::new("students"), &schema(), Aggregate::Count, Some("id")).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(\"id\") FROM \"students\"");
    }

    #[test]
    fn test_aggregate_over_limited_rows() {
        let query = Query::new("students").order_by("grade", Order::Desc).limit(2);
        let stmt = aggregate(&query, &schema(), Aggregate::Sum, Some("grade")).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT SUM(\"grade\") FROM (SELECT * FROM \"students\" ORDER BY \"grade\" DESC LIMIT 2)"
        );
    }

    #[test]
    fn test_sum_requires_column() {
        assert!(aggregate(&Query::new("students"), &schema(), Aggregate::Sum, None).is_err());
    }

    #[test]
    fn test_update_increment() {
        let stmt = update(
            &Query::new("students"),
            &schema(),
            &[Assignment::set("grade", Expr::column("grade") + 1)],
        )
        .unwrap();
        assert_eq!(stmt.sql, "UPDATE \"students\" SET \"grade\" = (\"grade\" + ?)");
        assert_eq!(stmt.params, vec![SqlValue::Integer(1)]);
    }

    #[test]
    fn test_update_params_precede_where_params() {
        let query = Query::new("students").filter(Predicate::eq("name", "Alan Turing"));
        let stmt = update(&query, &schema(), &[Assignment::set("grade", 12)]).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"students\" SET \"grade\" = ? WHERE \"name\" = ?"
        );
        assert_eq!(
            stmt.params,
            vec![SqlValue::Integer(12), SqlValue::Text("Alan Turing".into())]
        );
    }

    #[test]
    fn test_update_rejects_limit() {
        let query = Query::new("students").limit(1);
        assert!(update(&query, &schema(), &[Assignment::set("grade", 1)]).is_err());
        assert!(update(&Query::new("students"), &schema(), &[]).is_err());
    }

    #[test]
    fn test_delete_by_id() {
        let query = Query::new("students").filter(Predicate::eq("id", 3));
        let stmt = delete(&query, &schema()).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"students\" WHERE \"id\" = ?");
    }

    #[test]
    fn test_insert_returning() {
        let sql = insert(&schema(), &["name", "grade"]).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"students\" (\"name\", \"grade\") VALUES (?, ?) \
             RETURNING \"id\", \"name\", \"grade\""
        );
    }
}
