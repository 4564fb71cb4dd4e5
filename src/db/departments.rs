use rusqlite::params;

use super::*;

impl RecordStore {
    // =========================================================================
    // Departments
    // =========================================================================

    pub fn get_department_by_code(&self, code: &str) -> Result<Option<DbDepartment>, DbError> {
        self.find_one(&Match::new("dept_code", code.to_string()))
    }

    /// Resolve a department name (as shown in pick lists) to its id.
    pub fn department_id_by_name(&self, name: &str) -> Result<Option<String>, DbError> {
        self.lookup_id(Table::Departments, "dept_name", name)
    }

    /// Active departments whose name, code or manager contains `search`
    /// (case-insensitive), with their staff head count, ordered by code.
    pub fn list_departments(&self, search: &str) -> Result<Vec<DepartmentListRow>, DbError> {
        let pattern = like_pattern(search);
        let mut stmt = self.conn_ref().prepare(
            "SELECT dept_code, dept_name, manager, phone, email,
                    (SELECT COUNT(*) FROM staff WHERE department_id = departments.id) AS staff_count,
                    budget
             FROM departments
             WHERE (LOWER(dept_name) LIKE ?1 OR LOWER(dept_code) LIKE ?1 OR LOWER(manager) LIKE ?1)
               AND status = 'active'
             ORDER BY dept_code",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok(DepartmentListRow {
                dept_code: row.get(0)?,
                dept_name: row.get(1)?,
                manager: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                phone: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                email: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                staff_count: row.get(5)?,
                budget: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Names of active departments, for pick lists.
    pub fn active_department_names(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT dept_name FROM departments WHERE status = 'active' ORDER BY dept_name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Number of staff rows referencing the department.
    pub fn count_department_staff(&self, dept_id: &str) -> Result<i64, DbError> {
        self.scalar_i64(
            "SELECT COUNT(*) FROM staff WHERE department_id = ?1",
            &[Value::Text(dept_id.to_string())],
        )
    }

    /// Number of KPIs owned by the department.
    pub fn count_department_kpis(&self, dept_id: &str) -> Result<i64, DbError> {
        self.scalar_i64(
            "SELECT COUNT(*) FROM kpi WHERE department_id = ?1",
            &[Value::Text(dept_id.to_string())],
        )
    }

    /// Delete a department with its KPIs, staff, and every assignment and
    /// result hanging off them. Runs as one transaction.
    pub fn delete_department_cascade(&self, dept_id: &str) -> Result<CascadeSummary, DbError> {
        self.with_transaction(|db| {
            let conn = db.conn_ref();
            let mut summary = CascadeSummary::default();
            summary.results = conn.execute(
                "DELETE FROM kpi_results
                 WHERE kpi_id IN (SELECT id FROM kpi WHERE department_id = ?1)",
                params![dept_id],
            )?;
            summary.assignments = conn.execute(
                "DELETE FROM kpi_assignments
                 WHERE kpi_id IN (SELECT id FROM kpi WHERE department_id = ?1)
                    OR staff_id IN (SELECT id FROM staff WHERE department_id = ?1)",
                params![dept_id],
            )?;
            summary.kpis = db.delete(Table::Kpi, &Match::new("department_id", dept_id.to_string()))?;
            summary.staff =
                db.delete(Table::Staff, &Match::new("department_id", dept_id.to_string()))?;
            summary.departments = db.delete(Table::Departments, &Match::id(dept_id))?;
            Ok(summary)
        })
    }
}

/// `%term%` in lower case, for case-insensitive `LIKE` matching.
pub(crate) fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim().to_lowercase())
}
