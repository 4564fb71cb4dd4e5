//! Shared type definitions for the database layer.
//!
//! Each table has a row struct implementing [`Record`], which declares the
//! table's column list at compile time. The generic insert/update helpers in
//! `db::mod` build their SQL from these lists only.

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Duplicate value in {table}: {detail}")]
    UniqueViolation { table: &'static str, detail: String },

    #[error("Unknown column {column} for table {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema creation failed: {0}")]
    Schema(String),
}

impl DbError {
    /// Map a rusqlite error raised while writing `table`, singling out
    /// uniqueness violations.
    pub(crate) fn from_write(table: Table, err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = err {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return DbError::UniqueViolation {
                    table: table.name(),
                    detail: msg.clone().unwrap_or_else(|| "constraint failed".to_string()),
                };
            }
        }
        DbError::Sqlite(err)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

// =============================================================================
// Tables
// =============================================================================

/// The six tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Departments,
    Staff,
    KpiCategories,
    Kpi,
    KpiAssignments,
    KpiResults,
}

impl Table {
    /// Declaration order; also the key order of a backup document.
    pub const ALL: [Table; 6] = [
        Table::Departments,
        Table::Staff,
        Table::KpiCategories,
        Table::Kpi,
        Table::KpiAssignments,
        Table::KpiResults,
    ];

    /// Children before parents.
    pub const DELETE_ORDER: [Table; 6] = [
        Table::KpiResults,
        Table::KpiAssignments,
        Table::Kpi,
        Table::KpiCategories,
        Table::Staff,
        Table::Departments,
    ];

    /// Parents before children.
    pub const INSERT_ORDER: [Table; 6] = [
        Table::Departments,
        Table::KpiCategories,
        Table::Staff,
        Table::Kpi,
        Table::KpiAssignments,
        Table::KpiResults,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Departments => "departments",
            Table::Staff => "staff",
            Table::KpiCategories => "kpi_categories",
            Table::Kpi => "kpi",
            Table::KpiAssignments => "kpi_assignments",
            Table::KpiResults => "kpi_results",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Departments => DbDepartment::COLUMNS,
            Table::Staff => DbStaff::COLUMNS,
            Table::KpiCategories => DbKpiCategory::COLUMNS,
            Table::Kpi => DbKpi::COLUMNS,
            Table::KpiAssignments => DbKpiAssignment::COLUMNS,
            Table::KpiResults => DbKpiResult::COLUMNS,
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row type with a statically declared column list.
pub trait Record: Sized {
    const TABLE: Table;
    /// Every column, in schema order.
    const COLUMNS: &'static [&'static str];
    /// Columns written by an update. Never includes the id or the creation
    /// timestamp.
    const MUTABLE_COLUMNS: &'static [&'static str];

    /// Values in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;

    /// Build from a row selected with `COLUMNS` in order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// `column = value` selector for update and delete.
#[derive(Debug, Clone)]
pub struct Match {
    pub column: &'static str,
    pub value: Value,
}

impl Match {
    pub fn new(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    pub fn id(id: &str) -> Self {
        Self::new("id", id.to_string())
    }
}

// =============================================================================
// Enumerations stored as text
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentRole {
    #[default]
    Owner,
    Contributor,
    Reviewer,
}

impl AssignmentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentRole::Owner => "owner",
            AssignmentRole::Contributor => "contributor",
            AssignmentRole::Reviewer => "reviewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Some(AssignmentRole::Owner),
            "contributor" => Some(AssignmentRole::Contributor),
            "reviewer" => Some(AssignmentRole::Reviewer),
            _ => None,
        }
    }
}

// =============================================================================
// Row helpers
// =============================================================================

/// Read a nullable TEXT column as a plain string (NULL becomes empty).
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn opt_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

// =============================================================================
// Row structs
// =============================================================================

/// A row from the `departments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDepartment {
    pub id: String,
    pub dept_code: String,
    pub dept_name: String,
    pub description: String,
    pub manager: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    /// Free text, stored as typed.
    pub budget: String,
    pub max_staff: i64,
    pub created_date: String,
    pub status: String,
}

impl Record for DbDepartment {
    const TABLE: Table = Table::Departments;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "dept_code",
        "dept_name",
        "description",
        "manager",
        "phone",
        "email",
        "address",
        "budget",
        "max_staff",
        "created_date",
        "status",
    ];
    const MUTABLE_COLUMNS: &'static [&'static str] = &[
        "dept_code",
        "dept_name",
        "description",
        "manager",
        "phone",
        "email",
        "address",
        "budget",
        "max_staff",
        "status",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.dept_code.clone()),
            Value::Text(self.dept_name.clone()),
            Value::Text(self.description.clone()),
            Value::Text(self.manager.clone()),
            Value::Text(self.phone.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.address.clone()),
            Value::Text(self.budget.clone()),
            Value::Integer(self.max_staff),
            Value::Text(self.created_date.clone()),
            Value::Text(self.status.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dept_code: row.get(1)?,
            dept_name: row.get(2)?,
            description: text(row, 3)?,
            manager: text(row, 4)?,
            phone: text(row, 5)?,
            email: text(row, 6)?,
            address: text(row, 7)?,
            budget: text(row, 8)?,
            max_staff: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
            created_date: text(row, 10)?,
            status: text(row, 11)?,
        })
    }
}

/// A row from the `staff` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStaff {
    pub id: String,
    pub staff_code: String,
    pub full_name: String,
    pub birth_date: String,
    pub gender: String,
    pub id_number: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub department_id: String,
    pub position: String,
    pub education: String,
    /// Free text, stored as typed (empty when not given).
    pub basic_salary: String,
    pub start_date: String,
    pub status: String,
    pub created_date: String,
}

impl Record for DbStaff {
    const TABLE: Table = Table::Staff;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "staff_code",
        "full_name",
        "birth_date",
        "gender",
        "id_number",
        "phone",
        "email",
        "address",
        "department_id",
        "position",
        "education",
        "basic_salary",
        "start_date",
        "status",
        "created_date",
    ];
    const MUTABLE_COLUMNS: &'static [&'static str] = &[
        "staff_code",
        "full_name",
        "birth_date",
        "gender",
        "id_number",
        "phone",
        "email",
        "address",
        "department_id",
        "position",
        "education",
        "basic_salary",
        "start_date",
        "status",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.staff_code.clone()),
            Value::Text(self.full_name.clone()),
            Value::Text(self.birth_date.clone()),
            Value::Text(self.gender.clone()),
            Value::Text(self.id_number.clone()),
            Value::Text(self.phone.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.address.clone()),
            Value::Text(self.department_id.clone()),
            Value::Text(self.position.clone()),
            Value::Text(self.education.clone()),
            Value::Text(self.basic_salary.clone()),
            Value::Text(self.start_date.clone()),
            Value::Text(self.status.clone()),
            Value::Text(self.created_date.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            staff_code: row.get(1)?,
            full_name: row.get(2)?,
            birth_date: text(row, 3)?,
            gender: text(row, 4)?,
            id_number: text(row, 5)?,
            phone: text(row, 6)?,
            email: text(row, 7)?,
            address: text(row, 8)?,
            department_id: text(row, 9)?,
            position: text(row, 10)?,
            education: text(row, 11)?,
            basic_salary: text(row, 12)?,
            start_date: text(row, 13)?,
            status: text(row, 14)?,
            created_date: text(row, 15)?,
        })
    }
}

/// A row from the `kpi_categories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbKpiCategory {
    pub id: String,
    pub category_name: String,
    pub description: String,
    pub created_date: String,
}

impl Record for DbKpiCategory {
    const TABLE: Table = Table::KpiCategories;
    const COLUMNS: &'static [&'static str] = &["id", "category_name", "description", "created_date"];
    const MUTABLE_COLUMNS: &'static [&'static str] = &["category_name", "description"];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.category_name.clone()),
            Value::Text(self.description.clone()),
            Value::Text(self.created_date.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category_name: row.get(1)?,
            description: text(row, 2)?,
            created_date: text(row, 3)?,
        })
    }
}

/// A row from the `kpi` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbKpi {
    pub id: String,
    pub kpi_code: String,
    pub kpi_name: String,
    pub description: String,
    pub category_id: Option<String>,
    pub department_id: Option<String>,
    pub unit: String,
    pub target_value: f64,
    pub weight: f64,
    pub measurement_frequency: String,
    pub created_date: String,
    pub status: String,
}

impl Record for DbKpi {
    const TABLE: Table = Table::Kpi;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "kpi_code",
        "kpi_name",
        "description",
        "category_id",
        "department_id",
        "unit",
        "target_value",
        "weight",
        "measurement_frequency",
        "created_date",
        "status",
    ];
    const MUTABLE_COLUMNS: &'static [&'static str] = &[
        "kpi_code",
        "kpi_name",
        "description",
        "category_id",
        "department_id",
        "unit",
        "target_value",
        "weight",
        "measurement_frequency",
        "status",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.kpi_code.clone()),
            Value::Text(self.kpi_name.clone()),
            Value::Text(self.description.clone()),
            opt_text(&self.category_id),
            opt_text(&self.department_id),
            Value::Text(self.unit.clone()),
            Value::Real(self.target_value),
            Value::Real(self.weight),
            Value::Text(self.measurement_frequency.clone()),
            Value::Text(self.created_date.clone()),
            Value::Text(self.status.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kpi_code: row.get(1)?,
            kpi_name: row.get(2)?,
            description: text(row, 3)?,
            category_id: row.get(4)?,
            department_id: row.get(5)?,
            unit: text(row, 6)?,
            target_value: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
            weight: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            measurement_frequency: text(row, 9)?,
            created_date: text(row, 10)?,
            status: text(row, 11)?,
        })
    }
}

/// A row from the `kpi_assignments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbKpiAssignment {
    pub id: String,
    pub kpi_id: String,
    pub staff_id: String,
    pub assigned_date: String,
    pub role: String,
}

impl Record for DbKpiAssignment {
    const TABLE: Table = Table::KpiAssignments;
    const COLUMNS: &'static [&'static str] = &["id", "kpi_id", "staff_id", "assigned_date", "role"];
    const MUTABLE_COLUMNS: &'static [&'static str] = &["kpi_id", "staff_id", "role"];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.kpi_id.clone()),
            Value::Text(self.staff_id.clone()),
            Value::Text(self.assigned_date.clone()),
            Value::Text(self.role.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kpi_id: text(row, 1)?,
            staff_id: text(row, 2)?,
            assigned_date: text(row, 3)?,
            role: text(row, 4)?,
        })
    }
}

/// A row from the `kpi_results` table. Results are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbKpiResult {
    pub id: String,
    pub kpi_id: String,
    pub period: String,
    pub actual_value: f64,
    pub achievement_percentage: f64,
    pub note: String,
    pub recorded_by: String,
    pub recorded_date: String,
}

impl Record for DbKpiResult {
    const TABLE: Table = Table::KpiResults;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "kpi_id",
        "period",
        "actual_value",
        "achievement_percentage",
        "note",
        "recorded_by",
        "recorded_date",
    ];
    const MUTABLE_COLUMNS: &'static [&'static str] = &[];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.kpi_id.clone()),
            Value::Text(self.period.clone()),
            Value::Real(self.actual_value),
            Value::Real(self.achievement_percentage),
            Value::Text(self.note.clone()),
            Value::Text(self.recorded_by.clone()),
            Value::Text(self.recorded_date.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kpi_id: text(row, 1)?,
            period: text(row, 2)?,
            actual_value: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
            achievement_percentage: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            note: text(row, 5)?,
            recorded_by: text(row, 6)?,
            recorded_date: text(row, 7)?,
        })
    }
}

// =============================================================================
// List view rows
// =============================================================================

/// A row of the department list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentListRow {
    pub dept_code: String,
    pub dept_name: String,
    pub manager: String,
    pub phone: String,
    pub email: String,
    pub staff_count: i64,
    pub budget: String,
}

/// A row of the staff list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffListRow {
    pub staff_code: String,
    pub full_name: String,
    pub dept_name: String,
    pub position: String,
    pub phone: String,
    pub email: String,
    pub basic_salary: String,
    pub status: String,
}

/// A row of the KPI list view. `dept_name` is `None` for KPIs without a
/// department.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiListRow {
    pub kpi_code: String,
    pub kpi_name: String,
    pub dept_name: Option<String>,
    pub unit: String,
    pub target_value: f64,
    pub weight: f64,
    pub measurement_frequency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentListRow {
    pub kpi_code: String,
    pub kpi_name: String,
    pub staff_code: String,
    pub full_name: String,
    pub role: String,
    pub assigned_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultListRow {
    pub kpi_code: String,
    pub kpi_name: String,
    pub period: String,
    pub target_value: f64,
    pub actual_value: f64,
    pub achievement_percentage: f64,
    pub note: String,
    pub recorded_date: String,
}

/// Row counts removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub departments: usize,
    pub staff: usize,
    pub kpis: usize,
    pub assignments: usize,
    pub results: usize,
}

impl CascadeSummary {
    pub fn total(&self) -> usize {
        self.departments + self.staff + self.kpis + self.assignments + self.results
    }
}
