//! Read-only aggregate reports over the record store.
//!
//! Each report is a typed struct built from one aggregate query plus a
//! `render()` producing the printable text. Ratios fall back to 0 when the
//! denominator is zero.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;

use crate::db::{DbError, RecordStore, Table};

const RULE: &str = "------------------------------------------------------------";

/// `num / den * 100`, or 0 when `den` is zero.
pub fn ratio(num: i64, den: i64) -> f64 {
    if den > 0 {
        num as f64 / den as f64 * 100.0
    } else {
        0.0
    }
}

fn generated_at() -> String {
    chrono::Local::now().format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Render a stored timestamp as `dd/mm/yyyy`. Unparseable values are shown as is.
pub fn display_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d/%m/%Y").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%d/%m/%Y").to_string();
    }
    raw.to_string()
}

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    out.push('\n');
}

fn footer(out: &mut String, generated_at: &str) {
    let _ = writeln!(out, "Generated at: {generated_at}");
}

// =============================================================================
// Overview
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDepartment {
    pub dept_name: String,
    pub staff_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub active_departments: i64,
    pub active_staff: i64,
    pub active_kpis: i64,
    pub assignments: i64,
    pub results: i64,
    pub avg_achievement: f64,
    /// Active department with the most active staff.
    pub top_department: Option<TopDepartment>,
    /// Assignments per active KPI, in percent.
    pub assignment_ratio: f64,
    pub generated_at: String,
}

pub fn overview(db: &RecordStore) -> Result<OverviewReport, DbError> {
    let active_departments =
        db.scalar_i64("SELECT COUNT(*) FROM departments WHERE status = 'active'", &[])?;
    let active_staff = db.scalar_i64("SELECT COUNT(*) FROM staff WHERE status = 'active'", &[])?;
    let active_kpis = db.scalar_i64("SELECT COUNT(*) FROM kpi WHERE status = 'active'", &[])?;
    let assignments = db.count(Table::KpiAssignments)?;
    let results = db.count(Table::KpiResults)?;
    let avg_achievement: Option<f64> = db.conn_ref().query_row(
        "SELECT AVG(achievement_percentage) FROM kpi_results",
        [],
        |row| row.get(0),
    )?;

    let mut stmt = db.conn_ref().prepare(
        "SELECT d.dept_name, COUNT(s.id) AS staff_count
         FROM departments d
         LEFT JOIN staff s ON d.id = s.department_id AND s.status = 'active'
         WHERE d.status = 'active'
         GROUP BY d.id, d.dept_name
         ORDER BY staff_count DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query_map([], |row| {
        Ok(TopDepartment {
            dept_name: row.get(0)?,
            staff_count: row.get(1)?,
        })
    })?;
    let top_department = match rows.next() {
        Some(row) => Some(row?),
        None => None,
    };

    Ok(OverviewReport {
        active_departments,
        active_staff,
        active_kpis,
        assignments,
        results,
        avg_achievement: avg_achievement.unwrap_or(0.0),
        top_department,
        assignment_ratio: ratio(assignments, active_kpis),
        generated_at: generated_at(),
    })
}

impl OverviewReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        header(&mut out, "SYSTEM OVERVIEW");
        let _ = writeln!(out, "Totals");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "- Departments: {}", self.active_departments);
        let _ = writeln!(out, "- Staff: {}", self.active_staff);
        let _ = writeln!(out, "- KPIs: {}", self.active_kpis);
        let _ = writeln!(out, "- KPI assignments: {}", self.assignments);
        let _ = writeln!(out, "- Recorded results: {}", self.results);
        out.push('\n');
        let _ = writeln!(out, "Performance");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "- Average achievement: {:.1}%", self.avg_achievement);
        match &self.top_department {
            Some(top) => {
                let _ = writeln!(
                    out,
                    "- Largest department: {} ({} staff)",
                    top.dept_name, top.staff_count
                );
            }
            None => {
                let _ = writeln!(out, "- Largest department: none (0 staff)");
            }
        }
        let _ = writeln!(out, "- Assignment ratio: {:.1}%", self.assignment_ratio);
        out.push('\n');
        footer(&mut out, &self.generated_at);
        out
    }
}

// =============================================================================
// Per department
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentKpiRow {
    pub dept_name: String,
    pub total_kpis: i64,
    pub assigned_kpis: i64,
    pub results: i64,
    pub avg_achievement: f64,
    /// Results per KPI, in percent.
    pub completion_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentKpiReport {
    pub rows: Vec<DepartmentKpiRow>,
    pub generated_at: String,
}

pub fn department_kpis(db: &RecordStore) -> Result<DepartmentKpiReport, DbError> {
    let mut stmt = db.conn_ref().prepare(
        "SELECT d.dept_name,
                COUNT(DISTINCT k.id) AS total_kpis,
                COUNT(DISTINCT ka.id) AS assigned_kpis,
                COUNT(DISTINCT kr.id) AS completed_results,
                AVG(kr.achievement_percentage) AS avg_achievement
         FROM departments d
         LEFT JOIN kpi k ON d.id = k.department_id
         LEFT JOIN kpi_assignments ka ON k.id = ka.kpi_id
         LEFT JOIN kpi_results kr ON k.id = kr.kpi_id
         WHERE d.status = 'active'
         GROUP BY d.id, d.dept_name
         ORDER BY avg_achievement DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let total_kpis: i64 = row.get(1)?;
        let results: i64 = row.get(3)?;
        Ok(DepartmentKpiRow {
            dept_name: row.get(0)?,
            total_kpis,
            assigned_kpis: row.get(2)?,
            results,
            avg_achievement: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            completion_ratio: ratio(results, total_kpis),
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(DepartmentKpiReport {
        rows: items,
        generated_at: generated_at(),
    })
}

impl DepartmentKpiReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        header(&mut out, "KPI BY DEPARTMENT");
        for row in &self.rows {
            let _ = writeln!(out, "Department: {}", row.dept_name);
            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(out, "- KPIs: {}", row.total_kpis);
            let _ = writeln!(out, "- Assigned KPIs: {}", row.assigned_kpis);
            let _ = writeln!(out, "- Recorded results: {}", row.results);
            let _ = writeln!(out, "- Average achievement: {:.1}%", row.avg_achievement);
            let _ = writeln!(out, "- Completion: {:.1}%", row.completion_ratio);
            out.push('\n');
        }
        footer(&mut out, &self.generated_at);
        out
    }
}

// =============================================================================
// Per staff member
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformanceRow {
    pub staff_code: String,
    pub full_name: String,
    pub dept_name: String,
    pub position: String,
    pub assigned_kpis: i64,
    pub results: i64,
    pub avg_achievement: f64,
    /// Results per assigned KPI, in percent.
    pub completion_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformanceReport {
    pub rows: Vec<StaffPerformanceRow>,
    pub generated_at: String,
}

/// Active staff with at least one assignment. Results are those recorded
/// against the KPIs they are assigned to.
pub fn staff_performance(db: &RecordStore) -> Result<StaffPerformanceReport, DbError> {
    let mut stmt = db.conn_ref().prepare(
        "SELECT s.staff_code, s.full_name, d.dept_name, s.position,
                COUNT(DISTINCT ka.id) AS assigned_kpis,
                COUNT(DISTINCT kr.id) AS completed_results,
                AVG(kr.achievement_percentage) AS avg_achievement
         FROM staff s
         JOIN departments d ON s.department_id = d.id
         LEFT JOIN kpi_assignments ka ON s.id = ka.staff_id
         LEFT JOIN kpi k ON ka.kpi_id = k.id
         LEFT JOIN kpi_results kr ON k.id = kr.kpi_id
         WHERE s.status = 'active'
         GROUP BY s.id, s.staff_code, s.full_name, d.dept_name, s.position
         HAVING assigned_kpis > 0
         ORDER BY avg_achievement DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let assigned_kpis: i64 = row.get(4)?;
        let results: i64 = row.get(5)?;
        Ok(StaffPerformanceRow {
            staff_code: row.get(0)?,
            full_name: row.get(1)?,
            dept_name: row.get(2)?,
            position: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            assigned_kpis,
            results,
            avg_achievement: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            completion_ratio: ratio(results, assigned_kpis),
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(StaffPerformanceReport {
        rows: items,
        generated_at: generated_at(),
    })
}

impl StaffPerformanceReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        header(&mut out, "STAFF PERFORMANCE");
        for row in &self.rows {
            let _ = writeln!(out, "{} ({})", row.full_name, row.staff_code);
            let _ = writeln!(out, "   - Department: {}", row.dept_name);
            let _ = writeln!(out, "   - Position: {}", row.position);
            let _ = writeln!(out, "   - Assigned KPIs: {}", row.assigned_kpis);
            let _ = writeln!(out, "   - Recorded results: {}", row.results);
            let _ = writeln!(out, "   - Average achievement: {:.1}%", row.avg_achievement);
            let _ = writeln!(out, "   - Completion: {:.1}%", row.completion_ratio);
            out.push('\n');
        }
        footer(&mut out, &self.generated_at);
        out
    }
}

// =============================================================================
// Per KPI
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDetailRow {
    pub kpi_code: String,
    pub kpi_name: String,
    pub dept_name: Option<String>,
    pub unit: String,
    pub target_value: f64,
    pub weight: f64,
    pub assigned_count: i64,
    pub result_count: i64,
    pub avg_achievement: f64,
    /// Latest `recorded_date` among the KPI's results.
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDetailReport {
    pub rows: Vec<KpiDetailRow>,
    pub generated_at: String,
}

pub fn kpi_details(db: &RecordStore) -> Result<KpiDetailReport, DbError> {
    let mut stmt = db.conn_ref().prepare(
        "SELECT k.kpi_code, k.kpi_name, d.dept_name, k.unit, k.target_value, k.weight,
                COUNT(DISTINCT ka.id) AS assigned_count,
                COUNT(DISTINCT kr.id) AS result_count,
                AVG(kr.achievement_percentage) AS avg_achievement,
                MAX(kr.recorded_date) AS last_update
         FROM kpi k
         LEFT JOIN departments d ON k.department_id = d.id
         LEFT JOIN kpi_assignments ka ON k.id = ka.kpi_id
         LEFT JOIN kpi_results kr ON k.id = kr.kpi_id
         WHERE k.status = 'active'
         GROUP BY k.id, k.kpi_code, k.kpi_name, d.dept_name, k.unit, k.target_value, k.weight
         ORDER BY k.kpi_code",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(KpiDetailRow {
            kpi_code: row.get(0)?,
            kpi_name: row.get(1)?,
            dept_name: row.get(2)?,
            unit: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            target_value: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            weight: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
            assigned_count: row.get(6)?,
            result_count: row.get(7)?,
            avg_achievement: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            last_update: row.get(9)?,
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(KpiDetailReport {
        rows: items,
        generated_at: generated_at(),
    })
}

impl KpiDetailReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        header(&mut out, "KPI DETAIL");
        for row in &self.rows {
            let _ = writeln!(out, "KPI: {} - {}", row.kpi_code, row.kpi_name);
            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(
                out,
                "- Department: {}",
                row.dept_name.as_deref().unwrap_or("Unassigned")
            );
            let _ = writeln!(out, "- Unit: {}", row.unit);
            let _ = writeln!(out, "- Target: {} {}", row.target_value, row.unit);
            let _ = writeln!(out, "- Weight: {}%", row.weight);
            let _ = writeln!(out, "- Assigned staff: {}", row.assigned_count);
            let _ = writeln!(out, "- Recorded results: {}", row.result_count);
            let _ = writeln!(out, "- Average achievement: {:.1}%", row.avg_achievement);
            let last = row
                .last_update
                .as_deref()
                .map(display_date)
                .unwrap_or_else(|| "never".to_string());
            let _ = writeln!(out, "- Last update: {last}");
            out.push('\n');
        }
        footer(&mut out, &self.generated_at);
        out
    }
}

// =============================================================================
// Database statistics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    /// Row count per table, in declaration order.
    pub table_counts: Vec<(Table, i64)>,
    pub active_departments: i64,
    pub active_staff: i64,
    pub active_kpis: i64,
    pub results_last_7_days: i64,
}

pub fn database_stats(db: &RecordStore) -> Result<DatabaseStats, DbError> {
    let mut table_counts = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        table_counts.push((table, db.count(table)?));
    }
    let since = (Utc::now() - Duration::days(7)).to_rfc3339();
    Ok(DatabaseStats {
        table_counts,
        active_departments: db
            .scalar_i64("SELECT COUNT(*) FROM departments WHERE status = 'active'", &[])?,
        active_staff: db.scalar_i64("SELECT COUNT(*) FROM staff WHERE status = 'active'", &[])?,
        active_kpis: db.scalar_i64("SELECT COUNT(*) FROM kpi WHERE status = 'active'", &[])?,
        results_last_7_days: db.count_results_since(&since)?,
    })
}

impl DatabaseStats {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (table, count) in &self.table_counts {
            let _ = writeln!(out, "{}: {count} rows", table.name().to_uppercase());
        }
        out.push('\n');
        let _ = writeln!(out, "ACTIVE:");
        let _ = writeln!(out, "Departments: {}", self.active_departments);
        let _ = writeln!(out, "Staff: {}", self.active_staff);
        let _ = writeln!(out, "KPIs: {}", self.active_kpis);
        out.push('\n');
        let _ = writeln!(out, "Results in the last 7 days: {}", self.results_last_7_days);
        out
    }
}
