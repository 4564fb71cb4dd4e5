use rusqlite::params;

use super::departments::like_pattern;
use super::*;

/// A KPI together with the display names of its references, as loaded into
/// the KPI form on selection.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiWithNames {
    pub kpi: DbKpi,
    pub category_name: Option<String>,
    pub dept_name: Option<String>,
}

impl RecordStore {
    // =========================================================================
    // KPIs
    // =========================================================================

    pub fn get_kpi_by_code(&self, code: &str) -> Result<Option<DbKpi>, DbError> {
        self.find_one(&Match::new("kpi_code", code.to_string()))
    }

    pub fn get_kpi_with_names(&self, code: &str) -> Result<Option<KpiWithNames>, DbError> {
        let Some(kpi) = self.get_kpi_by_code(code)? else {
            return Ok(None);
        };
        let (category_name, dept_name) = self.conn_ref().query_row(
            "SELECT
                (SELECT category_name FROM kpi_categories WHERE id = ?1),
                (SELECT dept_name FROM departments WHERE id = ?2)",
            params![kpi.category_id, kpi.department_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Some(KpiWithNames {
            kpi,
            category_name,
            dept_name,
        }))
    }

    /// KPIs whose name or code contains `search`, optionally limited to one
    /// department (by name), ordered by code.
    pub fn list_kpis(
        &self,
        search: &str,
        dept_filter: Option<&str>,
    ) -> Result<Vec<KpiListRow>, DbError> {
        let mut sql = String::from(
            "SELECT k.kpi_code, k.kpi_name, d.dept_name, k.unit,
                    k.target_value, k.weight, k.measurement_frequency, k.status
             FROM kpi k
             LEFT JOIN departments d ON k.department_id = d.id
             WHERE (LOWER(k.kpi_name) LIKE ?1 OR LOWER(k.kpi_code) LIKE ?1)",
        );
        let mut params = vec![Value::Text(like_pattern(search))];
        if let Some(dept) = dept_filter {
            sql.push_str(" AND d.dept_name = ?2");
            params.push(Value::Text(dept.to_string()));
        }
        sql.push_str(" ORDER BY k.kpi_code");

        let mut stmt = self.conn_ref().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(KpiListRow {
                kpi_code: row.get(0)?,
                kpi_name: row.get(1)?,
                dept_name: row.get(2)?,
                unit: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                target_value: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                weight: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                measurement_frequency: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                status: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// `"CODE - Name"` for every active KPI.
    pub fn active_kpi_displays(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT kpi_code, kpi_name FROM kpi WHERE status = 'active' ORDER BY kpi_code",
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

    /// Assignments plus results referencing the KPI.
    pub fn count_kpi_dependents(&self, kpi_id: &str) -> Result<i64, DbError> {
        self.scalar_i64(
            "SELECT (SELECT COUNT(*) FROM kpi_assignments WHERE kpi_id = ?1)
                  + (SELECT COUNT(*) FROM kpi_results WHERE kpi_id = ?1)",
            &[Value::Text(kpi_id.to_string())],
        )
    }

    /// Delete a KPI with its results and assignments in one transaction.
    pub fn delete_kpi_cascade(&self, kpi_id: &str) -> Result<CascadeSummary, DbError> {
        self.with_transaction(|db| {
            let mut summary = CascadeSummary::default();
            summary.results =
                db.delete(Table::KpiResults, &Match::new("kpi_id", kpi_id.to_string()))?;
            summary.assignments =
                db.delete(Table::KpiAssignments, &Match::new("kpi_id", kpi_id.to_string()))?;
            summary.kpis = db.delete(Table::Kpi, &Match::id(kpi_id))?;
            Ok(summary)
        })
    }
}
