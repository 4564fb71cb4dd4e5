use super::*;

impl RecordStore {
    // =========================================================================
    // KPI results
    // =========================================================================

    /// Joined result rows, most recent first, optionally for one KPI code.
    pub fn list_results(&self, kpi_code: Option<&str>) -> Result<Vec<ResultListRow>, DbError> {
        let mut sql = String::from(
            "SELECT k.kpi_code, k.kpi_name, kr.period, k.target_value, kr.actual_value,
                    kr.achievement_percentage, kr.note, kr.recorded_date
             FROM kpi_results kr
             JOIN kpi k ON kr.kpi_id = k.id",
        );
        let mut params = Vec::new();
        if let Some(code) = kpi_code {
            sql.push_str(" WHERE k.kpi_code = ?1");
            params.push(Value::Text(code.to_string()));
        }
        sql.push_str(" ORDER BY kr.recorded_date DESC");

        let mut stmt = self.conn_ref().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(ResultListRow {
                kpi_code: row.get(0)?,
                kpi_name: row.get(1)?,
                period: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                target_value: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                actual_value: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                achievement_percentage: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                note: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                recorded_date: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Results recorded on or after `since` (RFC 3339 string comparison).
    pub fn count_results_since(&self, since: &str) -> Result<i64, DbError> {
        self.scalar_i64(
            "SELECT COUNT(*) FROM kpi_results WHERE recorded_date >= ?1",
            &[Value::Text(since.to_string())],
        )
    }
}
