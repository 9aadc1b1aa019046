//! Database handle and transactional sessions.
//!
//! [`Database`] owns one SQLite connection plus the table schemas it was opened
//! with. All reads and writes go through a [`Session`], which wraps a single
//! backend transaction: writes are visible to later reads in the same session
//! and become durable on [`Session::commit`]. Dropping a session without
//! committing rolls it back.

use crate::config::{Backend, Config};
use crate::otel::{db_span, record_db_metrics, DbOperation};
use crate::query::sql::{self, Statement};
use crate::query::{to_sql_value, Aggregate, Assignment, Predicate, Query};
use crate::schema::{students_schema, TableSchema};
use crate::types::row::value_from_sql;
use crate::types::{DatabaseError, Model, Result, Row};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Connection to the relational backend plus its table schemas.
pub struct Database {
    conn: Connection,
    config: Config,
    schemas: BTreeMap<String, TableSchema>,
}

impl Database {
    /// Open the configured backend for the given schemas.
    ///
    /// Schemas are validated here; tables are not created until
    /// [`create_all`](Self::create_all).
    ///
    /// # Errors
    ///
    /// - `ConfigError` for an unsupported connection string
    /// - `SchemaError` for an invalid or duplicated schema
    /// - `ConnectionError` if SQLite cannot open the backend
    pub fn open(config: &Config, schemas: Vec<TableSchema>) -> Result<Self> {
        let span = db_span(DbOperation::Connect, None);
        let _guard = span.enter();

        let mut registry = BTreeMap::new();
        for schema in schemas {
            schema.validate()?;
            let name = schema.name.clone();
            if registry.insert(name.clone(), schema).is_some() {
                return Err(DatabaseError::schema(format!(
                    "table '{}' registered twice",
                    name
                )));
            }
        }

        let backend = config.backend()?;
        let conn = match &backend {
            Backend::Memory => Connection::open_in_memory(),
            Backend::File(path) => Connection::open(path),
        }
        .map_err(|e| {
            DatabaseError::ConnectionError(format!("{} ({})", e, config.database_url))
        })?;
        // Opening is lazy: touch the header so a non-database file fails here
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("{} ({})", e, config.database_url))
            })?;

        info!(url = %config.database_url, tables = registry.len(), "opened database");
        Ok(Self {
            conn,
            config: config.clone(),
            schemas: registry,
        })
    }

    /// Open with the built-in `students` schema.
    pub fn open_students(config: &Config) -> Result<Self> {
        Self::open(config, vec![students_schema(config.enrolled_default)])
    }

    /// Open an in-memory backend (useful for testing).
    pub fn open_memory(schemas: Vec<TableSchema>) -> Result<Self> {
        Self::open(&Config::default(), schemas)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registered schema for a table.
    pub fn schema(&self, table: &str) -> Result<&TableSchema> {
        self.schemas
            .get(table)
            .ok_or_else(|| DatabaseError::SchemaNotFound(table.to_string()))
    }

    /// Create every registered table with its constraints and indexes.
    ///
    /// An existing table with the same column set is kept as is; one with a
    /// different column set is rejected.
    pub fn create_all(&self) -> Result<()> {
        let span = db_span(DbOperation::CreateSchema, None);
        let _guard = span.enter();

        for schema in self.schemas.values() {
            if self.table_exists(&schema.name)? {
                let existing: BTreeSet<String> = self.table_columns(&schema.name)?.into_iter().collect();
                let declared: BTreeSet<String> = schema.column_names().into_iter().collect();
                if existing != declared {
                    return Err(DatabaseError::schema(format!(
                        "table '{}' exists with columns {:?}, expected {:?}",
                        schema.name, existing, declared
                    )));
                }
                debug!(table = %schema.name, "table already present");
            } else {
                let ddl = schema.create_table_sql();
                debug!(sql = %ddl, "creating table");
                self.conn.execute(&ddl, [])?;
            }

            for ddl in schema.create_index_sql() {
                debug!(sql = %ddl, "creating index");
                self.conn.execute(&ddl, [])?;
            }
            info!(table = %schema.name, "schema ready");
        }
        Ok(())
    }

    /// `true` if the backend has a table with this name.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// User tables present in the backend.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Index names defined on a table.
    pub fn list_indexes(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' \
             AND tbl_name = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Begin a session (one backend transaction).
    pub fn session(&mut self) -> Result<Session<'_>> {
        let tx = self.conn.transaction()?;
        Ok(Session {
            tx,
            schemas: &self.schemas,
        })
    }

    /// Close the connection, reporting any close failure.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| DatabaseError::from(e))
    }
}

/// Unit of work over one transaction.
pub struct Session<'db> {
    tx: Transaction<'db>,
    schemas: &'db BTreeMap<String, TableSchema>,
}

impl<'db> Session<'db> {
    fn schema(&self, table: &str) -> Result<&'db TableSchema> {
        let schemas: &'db BTreeMap<String, TableSchema> = self.schemas;
        schemas
            .get(table)
            .ok_or_else(|| DatabaseError::SchemaNotFound(table.to_string()))
    }

    /// Insert new records in one batch.
    ///
    /// Rows are written inside a savepoint: if any row fails, none of the
    /// batch remains and earlier work in the session is untouched. Returns
    /// the persisted records, with backend-assigned ids, in input order.
    /// Columns a record leaves out are filled from the schema defaults.
    pub fn bulk_insert<M: Model>(&mut self, records: &[M::New]) -> Result<Vec<M>> {
        let span = db_span(DbOperation::Insert, Some(M::TABLE));
        let _guard = span.enter();

        if records.is_empty() {
            return Ok(Vec::new());
        }
        let schema = self.schema(M::TABLE)?;

        let savepoint = self.tx.savepoint()?;
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            let values = M::insert_values(record);
            let mut columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
            let mut params: Vec<SqlValue> = values.into_iter().map(|(_, v)| v).collect();

            for col in &schema.columns {
                if let Some(default) = &col.default {
                    if !columns.contains(&col.name.as_str()) {
                        columns.push(col.name.as_str());
                        params.push(to_sql_value(&default.resolve()));
                    }
                }
            }

            let insert = sql::insert(schema, &columns)?;
            debug!(sql = %insert, "inserting row");
            let mut stmt = savepoint.prepare_cached(&insert)?;
            let persisted = stmt.query_row(params_from_iter(params), M::from_row)?;
            inserted.push(persisted);
        }
        savepoint.commit()?;

        record_db_metrics(None, Some(inserted.len()));
        Ok(inserted)
    }

    /// Insert a single record.
    pub fn insert<M: Model>(&mut self, record: M::New) -> Result<M> {
        let mut inserted = self.bulk_insert::<M>(std::slice::from_ref(&record))?;
        inserted
            .pop()
            .ok_or_else(|| DatabaseError::query("insert returned no row"))
    }

    /// Full records matching the query.
    ///
    /// The query must target `M`'s table and must not carry a projection;
    /// use [`rows`](Self::rows) for partial columns.
    pub fn all<M: Model>(&self, query: &Query) -> Result<Vec<M>> {
        let span = db_span(DbOperation::Select, Some(M::TABLE));
        let _guard = span.enter();

        if !query.columns.is_empty() {
            return Err(DatabaseError::query(
                "record queries load every column; use rows() for projections",
            ));
        }
        let schema = self.schema(M::TABLE)?;
        let stmt = sql::select(query, schema)?;
        debug!(sql = %stmt.sql, "selecting records");

        let mut prepared = self.tx.prepare(&stmt.sql)?;
        let records = prepared
            .query_map(params_from_iter(stmt.params.iter()), M::from_row)?
            .collect::<rusqlite::Result<Vec<M>>>()?;

        record_db_metrics(Some(records.len()), None);
        Ok(records)
    }

    /// First record matching the query, or `None` when nothing matches.
    ///
    /// A limit already on the query still applies, so `limit(0)` yields `None`.
    pub fn first<M: Model>(&self, query: &Query) -> Result<Option<M>> {
        let limited = query.clone().limit(query.limit.map_or(1, |n| n.min(1)));
        Ok(self.all::<M>(&limited)?.into_iter().next())
    }

    /// Record by primary key.
    pub fn get<M: Model>(&self, id: i64) -> Result<Option<M>> {
        let pk = primary_key(self.schema(M::TABLE)?)?;
        self.first::<M>(&M::query().filter(Predicate::eq(pk, id)))
    }

    /// Projected rows matching the query.
    pub fn rows(&self, query: &Query) -> Result<Vec<Row>> {
        let span = db_span(DbOperation::Select, Some(&query.table));
        let _guard = span.enter();

        let schema = self.schema(&query.table)?;
        let columns = sql::projected_columns(query, schema)?;
        let stmt = sql::select(query, schema)?;
        debug!(sql = %stmt.sql, "selecting rows");

        let mut prepared = self.tx.prepare(&stmt.sql)?;
        let rows = prepared
            .query_map(params_from_iter(stmt.params.iter()), |row| {
                Row::from_sql_row(&columns, row)
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        record_db_metrics(Some(rows.len()), None);
        Ok(rows)
    }

    /// Number of matching rows.
    ///
    /// With exactly one projected column this is `COUNT(column)` (nulls are
    /// not counted); otherwise `COUNT(*)`.
    pub fn count(&self, query: &Query) -> Result<i64> {
        let target = match query.columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        };
        let value = self.aggregate(query, Aggregate::Count, target)?;
        value
            .as_i64()
            .ok_or_else(|| DatabaseError::query(format!("count returned {}", value)))
    }

    /// Single aggregate value; `Null` for SUM/MIN/MAX/AVG over no rows.
    pub fn aggregate(
        &self,
        query: &Query,
        function: Aggregate,
        column: Option<&str>,
    ) -> Result<Value> {
        let span = db_span(DbOperation::Aggregate, Some(&query.table));
        let _guard = span.enter();

        let schema = self.schema(&query.table)?;
        let stmt = sql::aggregate(query, schema, function, column)?;
        debug!(sql = %stmt.sql, "aggregating");

        let value = self
            .tx
            .query_row(&stmt.sql, params_from_iter(stmt.params.iter()), |row| {
                Ok(value_from_sql(row.get_ref(0)?))
            })?;
        Ok(value)
    }

    /// Apply assignments to every row matching the query.
    ///
    /// Runs as one statement; returns the number of rows changed.
    pub fn update(&mut self, query: &Query, assignments: &[Assignment]) -> Result<usize> {
        let span = db_span(DbOperation::Update, Some(&query.table));
        let _guard = span.enter();

        let schema = self.schema(&query.table)?;
        let stmt = sql::update(query, schema, assignments)?;
        let affected = self.execute(&stmt)?;

        record_db_metrics(None, Some(affected));
        Ok(affected)
    }

    /// Delete one persisted record by primary key.
    ///
    /// Returns `false` if the row was already gone.
    pub fn delete<M: Model>(&mut self, record: &M) -> Result<bool> {
        let pk = primary_key(self.schema(M::TABLE)?)?;
        let query = M::query().filter(Predicate::eq(pk, record.id()));
        Ok(self.delete_where(&query)? > 0)
    }

    /// Delete every row matching the query; returns the number removed.
    pub fn delete_where(&mut self, query: &Query) -> Result<usize> {
        let span = db_span(DbOperation::Delete, Some(&query.table));
        let _guard = span.enter();

        let schema = self.schema(&query.table)?;
        let stmt = sql::delete(query, schema)?;
        let affected = self.execute(&stmt)?;

        record_db_metrics(None, Some(affected));
        Ok(affected)
    }

    fn execute(&self, stmt: &Statement) -> Result<usize> {
        debug!(sql = %stmt.sql, "executing");
        Ok(self
            .tx
            .execute(&stmt.sql, params_from_iter(stmt.params.iter()))?)
    }

    /// Make the session's writes durable.
    pub fn commit(self) -> Result<()> {
        let span = db_span(DbOperation::Commit, None);
        let _guard = span.enter();
        self.tx.commit()?;
        debug!("committed");
        Ok(())
    }

    /// Discard the session's writes.
    pub fn rollback(self) -> Result<()> {
        let span = db_span(DbOperation::Rollback, None);
        let _guard = span.enter();
        self.tx.rollback()?;
        debug!("rolled back");
        Ok(())
    }
}

fn primary_key(schema: &TableSchema) -> Result<&str> {
    schema.primary_key().ok_or_else(|| {
        DatabaseError::schema(format!(
            "table '{}' has no single-column primary key",
            schema.name
        ))
    })
}
