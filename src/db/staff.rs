use rusqlite::params;

use super::departments::like_pattern;
use super::*;

impl RecordStore {
    // =========================================================================
    // Staff
    // =========================================================================

    pub fn get_staff_by_code(&self, code: &str) -> Result<Option<DbStaff>, DbError> {
        self.find_one(&Match::new("staff_code", code.to_string()))
    }

    /// Name of the department a staff member belongs to.
    pub fn staff_department_name(&self, staff_id: &str) -> Result<Option<String>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT d.dept_name FROM staff s
             JOIN departments d ON s.department_id = d.id
             WHERE s.id = ?1",
        )?;
        let mut rows = stmt.query_map(params![staff_id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Staff whose name or code contains `search`, optionally limited to one
    /// department (by name), ordered by code.
    pub fn list_staff(
        &self,
        search: &str,
        dept_filter: Option<&str>,
    ) -> Result<Vec<StaffListRow>, DbError> {
        let mut sql = String::from(
            "SELECT s.staff_code, s.full_name, d.dept_name, s.position, s.phone, s.email,
                    s.basic_salary, s.status
             FROM staff s
             JOIN departments d ON s.department_id = d.id
             WHERE (LOWER(s.full_name) LIKE ?1 OR LOWER(s.staff_code) LIKE ?1)",
        );
        let mut params = vec![Value::Text(like_pattern(search))];
        if let Some(dept) = dept_filter {
            sql.push_str(" AND d.dept_name = ?2");
            params.push(Value::Text(dept.to_string()));
        }
        sql.push_str(" ORDER BY s.staff_code");

        let mut stmt = self.conn_ref().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(StaffListRow {
                staff_code: row.get(0)?,
                full_name: row.get(1)?,
                dept_name: row.get(2)?,
                position: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                phone: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                email: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                basic_salary: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                status: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// `"CODE - Full Name"` for every active staff member.
    pub fn active_staff_displays(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT staff_code, full_name FROM staff WHERE status = 'active' ORDER BY staff_code",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(format!(
                "{} - {}",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?
            ))
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn count_staff_assignments(&self, staff_id: &str) -> Result<i64, DbError> {
        self.scalar_i64(
            "SELECT COUNT(*) FROM kpi_assignments WHERE staff_id = ?1",
            &[Value::Text(staff_id.to_string())],
        )
    }

    /// Delete a staff member and their assignments in one transaction.
    pub fn delete_staff_cascade(&self, staff_id: &str) -> Result<CascadeSummary, DbError> {
        self.with_transaction(|db| {
            let mut summary = CascadeSummary::default();
            summary.assignments = db.delete(
                Table::KpiAssignments,
                &Match::new("staff_id", staff_id.to_string()),
            )?;
            summary.staff = db.delete(Table::Staff, &Match::id(staff_id))?;
            Ok(summary)
        })
    }
}
