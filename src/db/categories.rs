use rusqlite::params;

use super::*;

impl RecordStore {
    // =========================================================================
    // KPI categories
    // =========================================================================

    /// Every category ordered by name.
    pub fn list_categories(&self) -> Result<Vec<DbKpiCategory>, DbError> {
        let sql = format!(
            "SELECT {} FROM kpi_categories ORDER BY category_name",
            DbKpiCategory::COLUMNS.join(", ")
        );
        let mut stmt = self.conn_ref().prepare(&sql)?;
        let rows = stmt.query_map([], DbKpiCategory::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn category_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self
            .list_categories()?
            .into_iter()
            .map(|c| c.category_name)
            .collect())
    }

    pub fn category_id_by_name(&self, name: &str) -> Result<Option<String>, DbError> {
        self.lookup_id(Table::KpiCategories, "category_name", name)
    }

    /// Delete a category. KPIs in it are kept and lose their category.
    /// Returns the number of KPIs detached.
    pub fn delete_category(&self, category_id: &str) -> Result<usize, DbError> {
        self.with_transaction(|db| {
            let detached = db.conn_ref().execute(
                "UPDATE kpi SET category_id = NULL WHERE category_id = ?1",
                params![category_id],
            )?;
            db.delete(Table::KpiCategories, &Match::id(category_id))?;
            Ok(detached)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    fn category(id: &str, name: &str) -> DbKpiCategory {
        DbKpiCategory {
            id: id.to_string(),
            category_name: name.to_string(),
            description: String::new(),
            created_date: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_category_names_sorted_and_unique() {
        let db = test_db();
        db.insert(&category("c2", "Sales")).unwrap();
        db.insert(&category("c1", "Finance")).unwrap();
        assert_eq!(db.category_names().unwrap(), vec!["Finance", "Sales"]);

        let err = db.insert(&category("c3", "Sales")).unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(db.category_id_by_name("Sales").unwrap().as_deref(), Some("c2"));
    }

    #[test]
    fn test_delete_category_detaches_kpis() {
        let db = test_db();
        db.insert(&category("c1", "Finance")).unwrap();
        db.insert(&DbKpi {
            id: "k1".to_string(),
            kpi_code: "KPI001".to_string(),
            kpi_name: "Cost".to_string(),
            description: String::new(),
            category_id: Some("c1".to_string()),
            department_id: None,
            unit: "VND".to_string(),
            target_value: 1.0,
            weight: 1.0,
            measurement_frequency: String::new(),
            created_date: String::new(),
            status: "active".to_string(),
        })
        .unwrap();

        assert_eq!(db.delete_category("c1").unwrap(), 1);
        let kpi = db.get_kpi_by_code("KPI001").unwrap().unwrap();
        assert_eq!(kpi.category_id, None);
        assert_eq!(db.count(Table::KpiCategories).unwrap(), 0);
    }
}
