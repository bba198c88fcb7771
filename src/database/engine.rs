//! DuckDB-based storage engine
//!
//! One connection guarded by a mutex. All calls are blocking; async callers
//! go through [`super::StoreSource`] or `spawn_blocking`.

use super::query::{where_clause, Condition, OrderBy, Resource};
use crate::error::{Error, Result};
use duckdb::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Storage engine using DuckDB
pub struct DatabaseEngine {
    /// DuckDB connection
    conn: Mutex<Connection>,
    /// File path or `:memory:` (for logging)
    location: String,
}

impl DatabaseEngine {
    /// Open a database file, or an in-memory database if no path is given
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let (conn, location) = match path {
            Some(path) => (
                Connection::open(path).map_err(|e| {
                    Error::store(format!("Failed to open {}: {e}", path.display()))
                })?,
                path.display().to_string(),
            ),
            None => (
                Connection::open_in_memory()
                    .map_err(|e| Error::store(format!("Failed to create DuckDB connection: {e}")))?,
                ":memory:".to_string(),
            ),
        };

        tracing::debug!(location = %location, "Opened database");

        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Where the data lives
    pub fn location(&self) -> &str {
        &self.location
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::store("database connection lock poisoned"))
    }

    /// Create the table of a resource if it does not exist yet
    pub fn migrate<R: Resource>(&self) -> Result<()> {
        let columns: Vec<String> = R::COLUMNS
            .iter()
            .map(|c| format!("{c} VARCHAR NOT NULL"))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
            R::TABLE,
            columns.join(", "),
            R::primary_key()
        );

        tracing::debug!("Executing query: {}", sql);

        self.conn()?
            .execute_batch(&sql)
            .map_err(|e| Error::store(format!("Failed to migrate {}: {e}", R::TABLE)))
    }

    /// Insert a new row
    pub fn create<R: Resource>(&self, resource: &R) -> Result<()> {
        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            R::TABLE,
            R::COLUMNS.join(", ")
        );

        tracing::debug!("Executing query: {}", sql);

        self.conn()?
            .execute(&sql, params_from_iter(resource.to_row()))
            .map_err(|e| Error::store(format!("Failed to insert into {}: {e}", R::TABLE)))?;

        Ok(())
    }

    /// Fetch the single row matching all conditions
    pub fn get<R: Resource>(&self, conditions: &[Condition]) -> Result<R> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT {} FROM {}{} LIMIT 1",
            R::COLUMNS.join(", "),
            R::TABLE,
            where_clause(conditions, &mut params)
        );

        self.query::<R>(&sql, params)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(R::NAME))
    }

    /// Overwrite an existing row, identified by its primary key
    pub fn save<R: Resource>(&self, resource: &R) -> Result<()> {
        let assignments: Vec<String> = R::COLUMNS[1..]
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            R::TABLE,
            assignments.join(", "),
            R::primary_key()
        );

        // Values in SET order, then the key for the WHERE clause
        let mut row = resource.to_row();
        let id = row.remove(0);
        row.push(id);

        tracing::debug!("Executing query: {}", sql);

        let changed = self
            .conn()?
            .execute(&sql, params_from_iter(row))
            .map_err(|e| Error::store(format!("Failed to update {}: {e}", R::TABLE)))?;

        if changed == 0 {
            return Err(Error::not_found(R::NAME));
        }
        Ok(())
    }

    /// Delete all rows matching the conditions; at least one must match
    pub fn delete<R: Resource>(&self, conditions: &[Condition]) -> Result<()> {
        let changed = execute_delete::<R>(&*self.conn()?, conditions)?;

        if changed == 0 {
            return Err(Error::not_found(R::NAME));
        }
        Ok(())
    }

    /// Delete rows of `R` together with their dependent rows of `D` in one
    /// transaction
    ///
    /// At least one `R` row must match; `D` rows are optional. Nothing is
    /// deleted if any step fails.
    pub fn delete_cascade<R: Resource, D: Resource>(
        &self,
        conditions: &[Condition],
        dependents: &[Condition],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::store(format!("Failed to begin transaction: {e}")))?;

        if execute_delete::<R>(&tx, conditions)? == 0 {
            return Err(Error::not_found(R::NAME));
        }
        let removed = execute_delete::<D>(&tx, dependents)?;

        tx.commit()
            .map_err(|e| Error::store(format!("Failed to commit delete from {}: {e}", R::TABLE)))?;

        tracing::debug!(table = D::TABLE, removed, "Removed dependent rows");
        Ok(())
    }

    /// Count rows matching the conditions
    pub fn count<R: Resource>(&self, conditions: &[Condition]) -> Result<i64> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            R::TABLE,
            where_clause(conditions, &mut params)
        );

        self.conn()?
            .query_row(&sql, params_from_iter(params), |row| row.get(0))
            .map_err(|e| Error::store(format!("Failed to count {}: {e}", R::TABLE)))
    }

    /// Fetch one window of rows in a fixed order
    pub fn list<R: Resource>(
        &self,
        order: &OrderBy,
        offset: i64,
        limit: i64,
        conditions: &[Condition],
    ) -> Result<Vec<R>> {
        if offset < 0 || limit < 0 {
            return Err(Error::invalid_argument(format!(
                "invalid window: offset {offset}, limit {limit}"
            )));
        }

        let mut params = Vec::new();
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT {limit} OFFSET {offset}",
            R::COLUMNS.join(", "),
            R::TABLE,
            where_clause(conditions, &mut params),
            order.to_sql()
        );

        self.query::<R>(&sql, params)
    }

    fn query<R: Resource>(&self, sql: &str, params: Vec<String>) -> Result<Vec<R>> {
        tracing::debug!("Executing query: {}", sql);

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::store(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params_from_iter(params), |row| R::from_row(row))
            .map_err(|e| Error::store(format!("Failed to query {}: {e}", R::TABLE)))?
            .collect::<duckdb::Result<Vec<R>>>()
            .map_err(|e| Error::store(format!("Failed to read {}: {e}", R::TABLE)))?;

        Ok(rows)
    }
}

fn execute_delete<R: Resource>(conn: &Connection, conditions: &[Condition]) -> Result<usize> {
    let mut params = Vec::new();
    let sql = format!(
        "DELETE FROM {}{}",
        R::TABLE,
        where_clause(conditions, &mut params)
    );

    tracing::debug!("Executing query: {}", sql);

    conn.execute(&sql, params_from_iter(params))
        .map_err(|e| Error::store(format!("Failed to delete from {}: {e}", R::TABLE)))
}
