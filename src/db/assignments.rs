use rusqlite::params;

use super::*;

impl RecordStore {
    // =========================================================================
    // KPI assignments
    // =========================================================================

    pub fn assignment_exists(&self, kpi_id: &str, staff_id: &str) -> Result<bool, DbError> {
        Ok(self.conn_ref().query_row(
            "SELECT EXISTS(SELECT 1 FROM kpi_assignments WHERE kpi_id = ?1 AND staff_id = ?2)",
            params![kpi_id, staff_id],
            |row| row.get(0),
        )?)
    }

    /// Remove the assignment(s) linking a KPI and a staff member.
    pub fn delete_assignment_pair(&self, kpi_id: &str, staff_id: &str) -> Result<usize, DbError> {
        Ok(self.conn_ref().execute(
            "DELETE FROM kpi_assignments WHERE kpi_id = ?1 AND staff_id = ?2",
            params![kpi_id, staff_id],
        )?)
    }

    /// Joined assignment rows, most recent first.
    pub fn list_assignments(&self) -> Result<Vec<AssignmentListRow>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT k.kpi_code, k.kpi_name, s.staff_code, s.full_name, ka.role, ka.assigned_date
             FROM kpi_assignments ka
             JOIN kpi k ON ka.kpi_id = k.id
             JOIN staff s ON ka.staff_id = s.id
             ORDER BY ka.assigned_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AssignmentListRow {
                kpi_code: row.get(0)?,
                kpi_name: row.get(1)?,
                staff_code: row.get(2)?,
                full_name: row.get(3)?,
                role: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                assigned_date: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}
