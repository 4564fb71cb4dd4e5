// Category service
// KPI categories are added and listed from the admin tab.

use crate::db::{DbKpiCategory, Match, RecordStore};
use crate::error::DeskError;

use super::form;

const ENTITY: &str = "Category";

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
    pub category_name: String,
    pub description: String,
}

#[derive(Default)]
pub struct CategoryDesk {
    pub form: CategoryForm,
    rows: Vec<DbKpiCategory>,
}

impl CategoryDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Categories ordered by name.
    pub fn rows(&self) -> &[DbKpiCategory] {
        &self.rows
    }

    pub fn add(&mut self, db: &RecordStore) -> Result<DbKpiCategory, DeskError> {
        let record = DbKpiCategory {
            id: form::new_id(),
            category_name: form::require("category_name", &self.form.category_name)?,
            description: self.form.description.trim().to_string(),
            created_date: form::now_timestamp(),
        };
        db.insert(&record)
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Added KPI category {}", record.category_name);

        self.refresh(db)?;
        self.form = CategoryForm::default();
        Ok(record)
    }

    /// Delete a category by name. KPIs filed under it keep existing without
    /// a category; the number detached is returned.
    pub fn delete(&mut self, db: &RecordStore, name: &str) -> Result<usize, DeskError> {
        let category: DbKpiCategory = db
            .find_one(&Match::new("category_name", name.trim().to_string()))?
            .ok_or_else(|| DeskError::NotFound {
                entity: ENTITY,
                code: name.to_string(),
            })?;
        let detached = db.delete_category(&category.id)?;
        log::info!(
            "Deleted KPI category {} ({detached} KPIs detached)",
            category.category_name
        );

        self.refresh(db)?;
        Ok(detached)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_categories()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Table;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_add_requires_name() {
        let db = test_db();
        let mut desk = CategoryDesk::new();
        desk.form.description = "no name".to_string();
        assert!(matches!(
            desk.add(&db),
            Err(DeskError::MissingField("category_name"))
        ));
        assert_eq!(desk.form.description, "no name");
    }

    #[test]
    fn test_duplicate_name_is_conflict() {
        let db = test_db();
        let mut desk = CategoryDesk::new();
        desk.form.category_name = "Tài chính".to_string();
        desk.add(&db).unwrap();
        assert!(desk.form.category_name.is_empty());

        desk.form.category_name = "Tài chính".to_string();
        assert!(matches!(
            desk.add(&db),
            Err(DeskError::DuplicateCode { entity: "Category" })
        ));
        assert_eq!(desk.rows().len(), 1);
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let db = test_db();
        let mut desk = CategoryDesk::new();
        for name in ["Quality", "Finance", "Customer"] {
            desk.form.category_name = name.to_string();
            desk.add(&db).unwrap();
        }
        let names: Vec<&str> = desk.rows().iter().map(|c| c.category_name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Finance", "Quality"]);
    }

    #[test]
    fn test_delete_detaches_kpis() {
        let db = test_db();
        let mut desk = CategoryDesk::new();
        desk.form.category_name = "Finance".to_string();
        let cat = desk.add(&db).unwrap();
        db.conn_ref()
            .execute(
                "INSERT INTO kpi (id, kpi_code, kpi_name, category_id) VALUES ('k1', 'KPI001', 'Revenue', ?1)",
                [&cat.id],
            )
            .unwrap();

        assert_eq!(desk.delete(&db, "Finance").unwrap(), 1);
        assert_eq!(db.count(Table::KpiCategories).unwrap(), 0);
        assert_eq!(db.count(Table::Kpi).unwrap(), 1);
        assert!(desk.rows().is_empty());
    }
}
