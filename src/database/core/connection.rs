//! Database connection management
//!
//! This module provides the connection wrapper that plays the role of the
//! query executor for the settings store and the schema provisioner.

use anyhow::{anyhow, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params};

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Configure the connection
    fn configure(&self) -> Result<()> {
        // WAL keeps readers in other processes from blocking on a setting write.
        // In-memory databases answer "memory" here, which is fine.
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Execute a SQL statement with parameters, returning the affected row count
    pub fn execute_with_params<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.conn
            .execute(sql, params)
            .map_err(|e| anyhow!("Failed to execute SQL with params: {}", e))
    }

    /// Run a query and collect every row as a list of dynamically typed values
    pub fn query_rows<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map(params, |row| {
                (0..column_count)
                    .map(|idx| row.get::<_, Value>(idx))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read query row: {}", e))
    }

    /// Run a query that returns at most one row
    ///
    /// `Ok(None)` means the query matched nothing.
    pub fn query_optional<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn
            .query_row(sql, params, f)
            .optional()
            .map_err(|e| anyhow!("Failed to run query: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Check if a column exists on a table
    pub fn column_exists(&self, table_name: &str, column_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE",
                [table_name, column_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check column existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.sqlite3");
        let db = DatabaseConn::open_path(path.to_str().unwrap()).unwrap();
        db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_table_and_column_exists() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY, label TEXT)")
            .unwrap();

        assert!(db.table_exists("test_table").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
        assert!(db.column_exists("test_table", "label").unwrap());
        assert!(db.column_exists("test_table", "LABEL").unwrap());
        assert!(!db.column_exists("test_table", "missing").unwrap());
    }

    #[test]
    fn test_query_rows_and_optional() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)")
            .unwrap();
        let affected = db
            .execute_with_params("INSERT INTO kv (k, v) VALUES (?1, ?2), (?3, NULL)", ["a", "1", "b"])
            .unwrap();
        assert_eq!(affected, 2);

        let rows = db
            .query_rows("SELECT k, v FROM kv ORDER BY k", [])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Value::Text("1".to_string()));
        assert_eq!(rows[1][1], Value::Null);

        let missing: Option<String> = db
            .query_optional("SELECT v FROM kv WHERE k = ?1", ["zzz"], |row| row.get(0))
            .unwrap();
        assert_eq!(missing, None);
        assert_eq!(db.table_count("kv").unwrap(), 2);
    }
}
