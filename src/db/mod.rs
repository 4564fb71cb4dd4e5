//! SQLite-backed record store for departments, staff, KPIs and their results.
//!
//! The database lives at `~/.kpidesk/management_system.db` unless the caller
//! opens an explicit path. One connection is held for the lifetime of the
//! store; every statement auto-commits unless it runs inside
//! [`RecordStore::with_transaction`].

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

pub mod types;
pub use types::*;

/// Default database file name inside the data directory.
pub const DB_FILE_NAME: &str = "management_system.db";

pub struct RecordStore {
    conn: Connection,
    path: PathBuf,
}

impl RecordStore {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Path of the database file this store was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        match f(self) {
            Ok(val) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(val),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    Err(DbError::from(e).into())
                }
            },
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default path and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        Self::open_at(Self::default_path()?)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        crate::schema::ensure_schema(&conn).map_err(DbError::Schema)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        log::debug!("Opened record store at {}", path.display());
        Ok(Self { conn, path })
    }

    /// Resolve the default database path: `~/.kpidesk/management_system.db`.
    pub fn default_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".kpidesk").join(DB_FILE_NAME))
    }

    // =========================================================================
    // Generic access
    // =========================================================================

    /// Run any statement with positional parameters and collect every row.
    ///
    /// Write statements return no rows; their effect is committed as soon as
    /// the statement completes (outside of a transaction).
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(row.get::<_, Value>(idx)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    /// Insert one record, building the statement from its column list.
    pub fn insert<R: Record>(&self, record: &R) -> Result<(), DbError> {
        let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE.name(),
            R::COLUMNS.join(", "),
            placeholders.join(", ")
        );
        self.conn
            .execute(&sql, params_from_iter(record.values()))
            .map_err(|e| DbError::from_write(R::TABLE, e))?;
        Ok(())
    }

    /// Overwrite the mutable columns of every row matching `selector`.
    /// Returns the number of rows changed.
    pub fn update<R: Record>(&self, record: &R, selector: &Match) -> Result<usize, DbError> {
        check_column(R::TABLE, selector.column)?;
        let mut assignments = Vec::with_capacity(R::MUTABLE_COLUMNS.len());
        let mut params = Vec::with_capacity(R::MUTABLE_COLUMNS.len() + 1);
        for (column, value) in R::COLUMNS.iter().zip(record.values()) {
            if R::MUTABLE_COLUMNS.contains(column) {
                params.push(value);
                assignments.push(format!("{} = ?{}", column, params.len()));
            }
        }
        if assignments.is_empty() {
            return Ok(0);
        }
        params.push(selector.value.clone());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            R::TABLE.name(),
            assignments.join(", "),
            selector.column,
            params.len()
        );
        self.conn
            .execute(&sql, params_from_iter(params))
            .map_err(|e| DbError::from_write(R::TABLE, e))
    }

    /// Delete every row of `table` matching `selector`. Returns the number of
    /// rows removed.
    pub fn delete(&self, table: Table, selector: &Match) -> Result<usize, DbError> {
        check_column(table, selector.column)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name(), selector.column);
        Ok(self.conn.execute(&sql, [&selector.value])?)
    }

    /// Fetch records of type `R` where `column = value`, in rowid order.
    pub fn find<R: Record>(&self, selector: &Match) -> Result<Vec<R>, DbError> {
        check_column(R::TABLE, selector.column)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY rowid",
            R::COLUMNS.join(", "),
            R::TABLE.name(),
            selector.column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([&selector.value], R::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Fetch the first record matching `selector`, if any.
    pub fn find_one<R: Record>(&self, selector: &Match) -> Result<Option<R>, DbError> {
        Ok(self.find::<R>(selector)?.into_iter().next())
    }

    /// Every record of type `R`, in rowid order.
    pub fn all<R: Record>(&self) -> Result<Vec<R>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            R::COLUMNS.join(", "),
            R::TABLE.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], R::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: Table) -> Result<i64, DbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Every row of `table` as raw values in schema column order.
    pub fn table_rows(&self, table: Table) -> Result<Vec<Vec<Value>>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            table.columns().join(", "),
            table.name()
        );
        self.query(&sql, &[])
    }

    /// Insert raw values positionally (`INSERT INTO t VALUES (...)`).
    ///
    /// No column-name matching is performed: a row whose arity differs from
    /// the table fails with a SQLite error.
    pub fn insert_positional(&self, table: Table, row: &[Value]) -> Result<(), DbError> {
        let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} VALUES ({})",
            table.name(),
            placeholders.join(", ")
        );
        self.conn
            .execute(&sql, params_from_iter(row.iter()))
            .map_err(|e| DbError::from_write(table, e))?;
        Ok(())
    }

    /// Run a `SELECT COUNT(*) ...` style statement returning one integer.
    pub(crate) fn scalar_i64(&self, sql: &str, params: &[Value]) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row(sql, params_from_iter(params.iter()), |row| {
                row.get::<_, Option<i64>>(0)
            })?
            .unwrap_or(0))
    }

    /// Look up the surrogate id for `column = value` in `table`.
    pub(crate) fn lookup_id(
        &self,
        table: Table,
        column: &'static str,
        value: &str,
    ) -> Result<Option<String>, DbError> {
        check_column(table, column)?;
        let sql = format!("SELECT id FROM {} WHERE {} = ?1 LIMIT 1", table.name(), column);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([value], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

fn check_column(table: Table, column: &str) -> Result<(), DbError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(DbError::UnknownColumn {
            table: table.name(),
            column: column.to_string(),
        })
    }
}

pub mod assignments;
pub mod categories;
pub mod departments;
pub mod kpis;
pub mod results;
pub mod seed;
pub mod staff;

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::{sample_department, test_db};
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in Table::ALL {
            assert_eq!(db.count(table).expect("table should exist"), 0, "{table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("again.db");
        {
            let db = RecordStore::open_at(path.clone()).expect("first open");
            db.insert(&sample_department("d1", "PB001", "Finance"))
                .expect("insert");
        }
        let db = RecordStore::open_at(path).expect("second open");
        assert_eq!(db.count(Table::Departments).unwrap(), 1);
    }

    #[test]
    fn test_insert_then_find_by_code_round_trips() {
        let db = test_db();
        let dept = sample_department("d1", "PB001", "Phòng Tài Chính");
        db.insert(&dept).expect("insert");

        let found: DbDepartment = db
            .find_one(&Match::new("dept_code", "PB001".to_string()))
            .expect("query")
            .expect("row present");
        assert_eq!(found, dept);
    }

    #[test]
    fn test_duplicate_code_is_unique_violation() {
        let db = test_db();
        let first = sample_department("d1", "PB001", "Finance");
        db.insert(&first).expect("insert");

        let err = db
            .insert(&sample_department("d2", "PB001", "Other"))
            .expect_err("duplicate must fail");
        assert!(err.is_unique_violation(), "got {err:?}");

        let rows: Vec<DbDepartment> = db.all().unwrap();
        assert_eq!(rows, vec![first]);
    }

    #[test]
    fn test_update_preserves_id_and_created_date() {
        let db = test_db();
        let dept = sample_department("d1", "PB001", "Finance");
        db.insert(&dept).unwrap();

        let mut changed = dept.clone();
        changed.id = "ignored".to_string();
        changed.created_date = "ignored".to_string();
        changed.dept_name = "Treasury".to_string();
        let n = db
            .update(&changed, &Match::new("dept_code", "PB001".to_string()))
            .unwrap();
        assert_eq!(n, 1);

        let found: DbDepartment = db.find_one(&Match::id("d1")).unwrap().unwrap();
        assert_eq!(found.dept_name, "Treasury");
        assert_eq!(found.created_date, dept.created_date);
    }

    #[test]
    fn test_delete_by_match() {
        let db = test_db();
        db.insert(&sample_department("d1", "PB001", "Finance")).unwrap();
        db.insert(&sample_department("d2", "PB002", "Sales")).unwrap();

        let removed = db
            .delete(Table::Departments, &Match::new("dept_code", "PB001".to_string()))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.count(Table::Departments).unwrap(), 1);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let db = test_db();
        let err = db
            .delete(Table::Departments, &Match::new("nope", "x".to_string()))
            .expect_err("unknown column");
        assert!(matches!(err, DbError::UnknownColumn { .. }));
    }

    #[test]
    fn test_query_binds_positional_params() {
        let db = test_db();
        db.insert(&sample_department("d1", "PB001", "Finance")).unwrap();
        let rows = db
            .query(
                "SELECT dept_name, max_staff FROM departments WHERE dept_code = ?1",
                &[Value::Text("PB001".to_string())],
            )
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![Value::Text("Finance".to_string()), Value::Integer(8)]]
        );
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = test_db();
        let result: Result<(), DbError> = db.with_transaction(|tx| {
            tx.insert(&sample_department("d1", "PB001", "Finance"))?;
            tx.insert(&sample_department("d2", "PB001", "Duplicate"))?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(db.count(Table::Departments).unwrap(), 0);
    }

    #[test]
    fn test_failed_commit_leaves_no_open_transaction() {
        let db = test_db();
        let result: Result<(), DbError> = db.with_transaction(|tx| {
            tx.conn_ref().execute_batch(
                "PRAGMA defer_foreign_keys = ON;
                 INSERT INTO staff (id, staff_code, full_name, department_id, status)
                 VALUES ('s1', 'NV001', 'Orphan', 'missing', 'active');",
            )?;
            Ok(())
        });
        assert!(result.is_err(), "deferred FK violation fails the commit");
        assert_eq!(db.count(Table::Staff).unwrap(), 0);

        let next: Result<(), DbError> = db.with_transaction(|tx| {
            tx.insert(&sample_department("d1", "PB001", "Finance"))?;
            Ok(())
        });
        next.expect("a new transaction can begin");
        assert_eq!(db.count(Table::Departments).unwrap(), 1);
    }
}
