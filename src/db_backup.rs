//! Export, JSON backup/restore and file snapshots of the record store.
//!
//! **Export**: one CSV file per table, UTF-8 with a byte-order mark so
//! spreadsheet tools pick the encoding up. Reference columns are followed by
//! the referenced display names.
//!
//! **Backup / restore**: a JSON document holding every row of every table as
//! a positional value array. Restore replaces the whole store in one
//! transaction and re-inserts rows positionally, so a backup taken under a
//! different column layout fails instead of landing in the wrong columns.
//!
//! **Snapshot**: hot copy of the SQLite file through the online backup API.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::db::{RecordStore, Table};
use crate::error::DeskError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// =============================================================================
// CSV export
// =============================================================================

/// Human-readable CSV header for a table's export, in select order.
fn export_header(table: Table) -> &'static [&'static str] {
    match table {
        Table::Departments => &[
            "ID", "Code", "Name", "Description", "Manager", "Phone", "Email", "Address",
            "Budget", "Max staff", "Created", "Status",
        ],
        Table::Staff => &[
            "ID", "Code", "Full name", "Birth date", "Gender", "ID number", "Phone", "Email",
            "Address", "Department ID", "Position", "Education", "Salary", "Start date",
            "Status", "Created", "Department",
        ],
        Table::KpiCategories => &["ID", "Name", "Description", "Created"],
        Table::Kpi => &[
            "ID", "Code", "Name", "Description", "Category ID", "Department ID", "Unit",
            "Target", "Weight", "Frequency", "Created", "Status", "Category", "Department",
        ],
        Table::KpiAssignments => &[
            "ID", "KPI ID", "Staff ID", "Assigned", "Role", "KPI code", "Staff code",
        ],
        Table::KpiResults => &[
            "ID", "KPI ID", "Period", "Actual value", "Achievement %", "Note", "Recorded by",
            "Recorded", "KPI code", "KPI name",
        ],
    }
}

/// Every column of `table` (aliased `alias`) followed by joined display columns.
fn export_query(table: Table) -> String {
    let columns = |alias: &str| {
        table
            .columns()
            .iter()
            .map(|c| format!("{alias}.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    match table {
        Table::Departments | Table::KpiCategories => {
            format!("SELECT {} FROM {} t ORDER BY t.rowid", columns("t"), table.name())
        }
        Table::Staff => format!(
            "SELECT {}, d.dept_name FROM staff s
             LEFT JOIN departments d ON s.department_id = d.id
             ORDER BY s.rowid",
            columns("s")
        ),
        Table::Kpi => format!(
            "SELECT {}, c.category_name, d.dept_name FROM kpi k
             LEFT JOIN kpi_categories c ON k.category_id = c.id
             LEFT JOIN departments d ON k.department_id = d.id
             ORDER BY k.rowid",
            columns("k")
        ),
        Table::KpiAssignments => format!(
            "SELECT {}, k.kpi_code, s.staff_code FROM kpi_assignments ka
             LEFT JOIN kpi k ON ka.kpi_id = k.id
             LEFT JOIN staff s ON ka.staff_id = s.id
             ORDER BY ka.rowid",
            columns("ka")
        ),
        Table::KpiResults => format!(
            "SELECT {}, k.kpi_code, k.kpi_name FROM kpi_results kr
             LEFT JOIN kpi k ON kr.kpi_id = k.id
             ORDER BY kr.rowid",
            columns("kr")
        ),
    }
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// Write one `{table}_{YYYYmmdd_HHMMSS}.csv` per table into `dir`.
/// Returns the files written, in table declaration order.
pub fn export_all_data(db: &RecordStore, dir: &Path) -> Result<Vec<PathBuf>, DeskError> {
    std::fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let mut written = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let rows = db.query(&export_query(table), &[])?;
        let path = dir.join(format!("{}_{timestamp}.csv", table.name()));

        let mut file = File::create(&path)?;
        file.write_all(UTF8_BOM)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(export_header(table))?;
        for row in &rows {
            writer.write_record(row.iter().map(csv_field))?;
        }
        writer.flush()?;

        log::debug!("Exported {} rows of {table} to {}", rows.len(), path.display());
        written.push(path);
    }

    log::info!("Exported {} tables to {}", written.len(), dir.display());
    Ok(written)
}

// =============================================================================
// JSON backup / restore
// =============================================================================

/// On-disk backup layout: the backup timestamp plus every table's rows as
/// positional arrays in schema column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub backup_date: String,
    #[serde(default)]
    pub departments: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub staff: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub kpi_categories: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub kpi: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub kpi_assignments: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub kpi_results: Vec<Vec<JsonValue>>,
}

impl BackupDocument {
    pub fn rows(&self, table: Table) -> &[Vec<JsonValue>] {
        match table {
            Table::Departments => &self.departments,
            Table::Staff => &self.staff,
            Table::KpiCategories => &self.kpi_categories,
            Table::Kpi => &self.kpi,
            Table::KpiAssignments => &self.kpi_assignments,
            Table::KpiResults => &self.kpi_results,
        }
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Vec<JsonValue>> {
        match table {
            Table::Departments => &mut self.departments,
            Table::Staff => &mut self.staff,
            Table::KpiCategories => &mut self.kpi_categories,
            Table::Kpi => &mut self.kpi,
            Table::KpiAssignments => &mut self.kpi_assignments,
            Table::KpiResults => &mut self.kpi_results,
        }
    }

    pub fn total_rows(&self) -> usize {
        Table::ALL.iter().map(|t| self.rows(*t).len()).sum()
    }

    /// Snapshot every table of `db`.
    pub fn capture(db: &RecordStore) -> Result<Self, DeskError> {
        let mut doc = BackupDocument {
            backup_date: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            ..Default::default()
        };
        for table in Table::ALL {
            *doc.rows_mut(table) = db
                .table_rows(table)?
                .iter()
                .map(|row| row.iter().map(to_json).collect())
                .collect();
        }
        Ok(doc)
    }
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Blob(b) => JsonValue::String(String::from_utf8_lossy(b).into_owned()),
    }
}

fn from_json(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Write a pretty-printed JSON backup of every table to `path`. The file is
/// replaced atomically. Returns the number of rows written.
pub fn backup_to_json(db: &RecordStore, path: &Path) -> Result<usize, DeskError> {
    let doc = BackupDocument::capture(db)?;
    let json = serde_json::to_string_pretty(&doc)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path)
        .map_err(|e| DeskError::Backup(format!("Failed to write {}: {}", path.display(), e)))?;

    log::info!("Backed up {} rows to {}", doc.total_rows(), path.display());
    Ok(doc.total_rows())
}

/// Replace the whole store with the contents of the backup at `path`.
///
/// Runs in one transaction: on any failure (unreadable document, a row whose
/// arity differs from the table, a constraint violation) the store is left
/// as it was. Returns the number of rows restored.
pub fn restore_from_json(db: &RecordStore, path: &Path) -> Result<usize, DeskError> {
    let content = std::fs::read_to_string(path)?;
    let doc: BackupDocument = serde_json::from_str(&content)?;

    let restored = db.with_transaction(|tx| -> Result<usize, DeskError> {
        for table in Table::DELETE_ORDER {
            tx.conn_ref()
                .execute(&format!("DELETE FROM {}", table.name()), [])
                .map_err(crate::db::DbError::from)?;
        }
        let mut restored = 0;
        for table in Table::INSERT_ORDER {
            for row in doc.rows(table) {
                let values: Vec<Value> = row.iter().map(from_json).collect();
                tx.insert_positional(table, &values)?;
                restored += 1;
            }
        }
        Ok(restored)
    })?;

    log::info!(
        "Restored {restored} rows from {} (backup of {})",
        path.display(),
        doc.backup_date
    );
    Ok(restored)
}

// =============================================================================
// File snapshot
// =============================================================================

/// Copy the live database to `dest` with SQLite's online backup API. The
/// source stays open and usable throughout.
pub fn snapshot_database(db: &RecordStore, dest: &Path) -> Result<PathBuf, DeskError> {
    let mut backup_conn = rusqlite::Connection::open(dest)
        .map_err(|e| DeskError::Backup(format!("Failed to open backup file: {}", e)))?;

    let backup = rusqlite::backup::Backup::new(db.conn_ref(), &mut backup_conn)
        .map_err(|e| DeskError::Backup(format!("Failed to initialize backup: {}", e)))?;

    backup
        .step(-1)
        .map_err(|e| DeskError::Backup(format!("Backup failed: {}", e)))?;

    log::info!("Database snapshot written to {}", dest.display());
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::{DbDepartment, DbKpi, DbStaff, Match};

    fn seeded() -> RecordStore {
        let db = test_db();
        db.load_sample_data().expect("seed");
        db
    }

    #[test]
    fn test_export_writes_one_csv_per_table_with_bom() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");

        let files = export_all_data(&db, dir.path()).unwrap();
        assert_eq!(files.len(), 6);

        let staff_file = files
            .iter()
            .find(|p| p.file_name().unwrap().to_string_lossy().starts_with("staff_"))
            .expect("staff export");
        let bytes = std::fs::read(staff_file).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), export_header(Table::Staff).len());
        assert_eq!(&headers[16], "Department");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len() as i64, db.count(Table::Staff).unwrap());
        // Joined department name is filled in.
        assert!(rows.iter().all(|r| !r[16].is_empty()));
    }

    #[test]
    fn test_export_header_matches_query_width() {
        let db = seeded();
        for table in Table::ALL {
            let rows = db.query(&export_query(table), &[]).unwrap();
            assert!(!rows.is_empty(), "{table} has sample rows");
            assert_eq!(rows[0].len(), export_header(table).len(), "{table}");
        }
    }

    #[test]
    fn test_backup_restore_round_trip() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("backup.json");

        let before: Vec<Vec<Vec<Value>>> =
            Table::ALL.iter().map(|t| db.table_rows(*t).unwrap()).collect();
        let written = backup_to_json(&db, &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("Phòng"), "non-ASCII kept verbatim");
        assert!(json.starts_with("{\n  \"backup_date\""));

        // Change the store, then restore over it.
        db.delete(Table::KpiResults, &Match::new("period", "2024-01".to_string()))
            .unwrap();
        let restored = restore_from_json(&db, &path).unwrap();
        assert_eq!(restored, written);

        let after: Vec<Vec<Vec<Value>>> =
            Table::ALL.iter().map(|t| db.table_rows(*t).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_restore_with_wrong_arity_leaves_store_untouched() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");

        let mut doc = BackupDocument::capture(&db).unwrap();
        doc.kpi_results[0].pop();
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let departments_before: Vec<DbDepartment> = db.all().unwrap();
        let err = restore_from_json(&db, &path).unwrap_err();
        assert!(matches!(err, DeskError::Db(_)), "got {err:?}");

        let departments_after: Vec<DbDepartment> = db.all().unwrap();
        assert_eq!(departments_before, departments_after);
        assert_eq!(
            db.count(Table::KpiResults).unwrap() as usize,
            doc.kpi_results.len()
        );
    }

    #[test]
    fn test_restore_rejects_malformed_document() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            restore_from_json(&db, &path),
            Err(DeskError::Json(_))
        ));
        assert!(db.count(Table::Departments).unwrap() > 0);
    }

    #[test]
    fn test_restore_tolerates_alphabetical_table_order() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sorted.json");

        // Keys sorted alphabetically put kpi before departments.
        let doc = BackupDocument::capture(&db).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        restore_from_json(&db, &path).unwrap();
        let staff: Vec<DbStaff> = db.all().unwrap();
        let kpis: Vec<DbKpi> = db.all().unwrap();
        assert_eq!(staff.len(), doc.staff.len());
        assert_eq!(kpis.len(), doc.kpi.len());
    }

    #[test]
    fn test_snapshot_creates_readable_copy() {
        let db = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("snapshot.db");

        snapshot_database(&db, &dest).unwrap();
        let copy = RecordStore::open_at(dest).unwrap();
        assert_eq!(
            copy.count(Table::Departments).unwrap(),
            db.count(Table::Departments).unwrap()
        );
    }
}
