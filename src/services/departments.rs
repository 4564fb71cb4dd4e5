// Department service
// Form, selection and list state behind the department tab.

use serde::{Deserialize, Serialize};

use crate::db::{DbDepartment, DepartmentListRow, Match, RecordStatus, RecordStore};
use crate::error::DeskError;
use crate::types::NumericPolicy;

use super::form::{self, DeleteOutcome, DeletePrompt};

const ENTITY: &str = "Department";

/// Editable department fields exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentForm {
    pub dept_code: String,
    pub dept_name: String,
    pub description: String,
    pub manager: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub budget: String,
    pub max_staff: String,
}

impl DepartmentForm {
    pub fn from_record(dept: &DbDepartment) -> Self {
        Self {
            dept_code: dept.dept_code.clone(),
            dept_name: dept.dept_name.clone(),
            description: dept.description.clone(),
            manager: dept.manager.clone(),
            phone: dept.phone.clone(),
            email: dept.email.clone(),
            address: dept.address.clone(),
            budget: dept.budget.clone(),
            max_staff: dept.max_staff.to_string(),
        }
    }

    fn to_record(
        &self,
        policy: NumericPolicy,
        id: String,
        created_date: String,
        status: String,
    ) -> Result<DbDepartment, DeskError> {
        let dept_code = form::require("dept_code", &self.dept_code)?;
        let dept_name = form::require("dept_name", &self.dept_name)?;
        let manager = form::require("manager", &self.manager)?;
        let max_staff = form::parse_count(policy, "max_staff", &self.max_staff)?;
        Ok(DbDepartment {
            id,
            dept_code,
            dept_name,
            description: self.description.trim().to_string(),
            manager,
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            budget: self.budget.trim().to_string(),
            max_staff,
            created_date,
            status,
        })
    }
}

pub struct DepartmentManager {
    pub form: DepartmentForm,
    selected: Option<String>,
    rows: Vec<DepartmentListRow>,
    search: String,
    policy: NumericPolicy,
}

impl DepartmentManager {
    pub fn new(policy: NumericPolicy) -> Self {
        Self {
            form: DepartmentForm::default(),
            selected: None,
            rows: Vec::new(),
            search: String::new(),
            policy,
        }
    }

    pub fn rows(&self) -> &[DepartmentListRow] {
        &self.rows
    }

    /// Code of the selected department.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    /// Load the department with `code` into the form.
    pub fn select(&mut self, db: &RecordStore, code: &str) -> Result<(), DeskError> {
        let dept = db
            .get_department_by_code(code)?
            .ok_or_else(|| DeskError::NotFound {
                entity: ENTITY,
                code: code.to_string(),
            })?;
        self.form = DepartmentForm::from_record(&dept);
        self.selected = Some(dept.dept_code);
        Ok(())
    }

    pub fn add(&mut self, db: &RecordStore) -> Result<DbDepartment, DeskError> {
        let record = self.form.to_record(
            self.policy,
            form::new_id(),
            form::now_timestamp(),
            RecordStatus::Active.as_str().to_string(),
        )?;
        db.insert(&record)
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Added department {} ({})", record.dept_code, record.dept_name);

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    /// Overwrite the selected department with the form contents. The id,
    /// creation timestamp and status are kept.
    pub fn update(&mut self, db: &RecordStore) -> Result<DbDepartment, DeskError> {
        let code = self
            .selected
            .clone()
            .ok_or(DeskError::NoSelection("department"))?;
        let existing = db
            .get_department_by_code(&code)?
            .ok_or_else(|| DeskError::NotFound {
                entity: ENTITY,
                code: code.clone(),
            })?;
        let record = self.form.to_record(
            self.policy,
            existing.id,
            existing.created_date,
            existing.status,
        )?;
        db.update(&record, &Match::new("dept_code", code.clone()))
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Updated department {code}");

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    /// Delete the selected department together with its staff, its KPIs and
    /// everything recorded against them. `confirm` is asked first whenever
    /// the department still has staff or KPIs.
    pub fn delete(
        &mut self,
        db: &RecordStore,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let code = self
            .selected
            .clone()
            .ok_or(DeskError::NoSelection("department"))?;
        let dept = db
            .get_department_by_code(&code)?
            .ok_or_else(|| DeskError::NotFound {
                entity: ENTITY,
                code: code.clone(),
            })?;

        let dependents = db.count_department_staff(&dept.id)? + db.count_department_kpis(&dept.id)?;
        if dependents > 0 {
            let prompt = DeletePrompt {
                entity: ENTITY,
                code: code.clone(),
                dependents,
            };
            if !confirm(&prompt) {
                return Ok(DeleteOutcome::Cancelled);
            }
        }

        let summary = db.delete_department_cascade(&dept.id)?;
        log::info!(
            "Deleted department {code}: {} staff, {} KPIs, {} assignments, {} results",
            summary.staff,
            summary.kpis,
            summary.assignments,
            summary.results
        );

        self.refresh(db)?;
        self.clear_form();
        Ok(DeleteOutcome::Deleted(summary))
    }

    pub fn clear_form(&mut self) {
        self.form = DepartmentForm::default();
        self.selected = None;
    }

    pub fn search(&mut self, db: &RecordStore, term: &str) -> Result<(), DeskError> {
        self.search = term.to_string();
        self.refresh(db)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_departments(&self.search)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::{DbStaff, Table};

    fn finance_form() -> DepartmentForm {
        DepartmentForm {
            dept_code: "PB001".to_string(),
            dept_name: "Phòng Tài Chính".to_string(),
            manager: "Nguyễn Văn A".to_string(),
            budget: "500000000".to_string(),
            max_staff: "10".to_string(),
            ..Default::default()
        }
    }

    fn staff_in(db: &RecordStore, dept_id: &str, code: &str) {
        db.insert(&DbStaff {
            id: format!("s-{code}"),
            staff_code: code.to_string(),
            full_name: format!("Person {code}"),
            birth_date: String::new(),
            gender: "Nam".to_string(),
            id_number: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            department_id: dept_id.to_string(),
            position: "Chuyên viên".to_string(),
            education: String::new(),
            basic_salary: String::new(),
            start_date: String::new(),
            status: "active".to_string(),
            created_date: form::now_timestamp(),
        })
        .unwrap();
    }

    #[test]
    fn test_add_stores_record_and_clears_form() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();

        let added = mgr.add(&db).unwrap();
        assert_eq!(added.status, "active");
        assert_eq!(added.max_staff, 10);
        assert_eq!(mgr.form, DepartmentForm::default());
        assert_eq!(mgr.rows().len(), 1);
        assert_eq!(mgr.rows()[0].dept_code, "PB001");

        let stored = db.get_department_by_code("PB001").unwrap().unwrap();
        assert_eq!(stored, added);
    }

    #[test]
    fn test_missing_required_field_keeps_form() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = DepartmentForm {
            manager: "   ".to_string(),
            ..finance_form()
        };

        let err = mgr.add(&db).unwrap_err();
        assert!(matches!(err, DeskError::MissingField("manager")));
        assert!(err.keeps_form());
        assert_eq!(mgr.form.dept_code, "PB001");
        assert_eq!(db.count(Table::Departments).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        mgr.add(&db).unwrap();

        mgr.form = DepartmentForm {
            dept_name: "Other".to_string(),
            ..finance_form()
        };
        let err = mgr.add(&db).unwrap_err();
        assert!(matches!(err, DeskError::DuplicateCode { entity: "Department" }));
        assert_eq!(mgr.form.dept_name, "Other");
        assert_eq!(db.count(Table::Departments).unwrap(), 1);
    }

    #[test]
    fn test_max_staff_follows_numeric_policy() {
        let db = test_db();
        let mut lenient = DepartmentManager::new(NumericPolicy::DefaultToZero);
        lenient.form = DepartmentForm {
            max_staff: "ten".to_string(),
            ..finance_form()
        };
        assert_eq!(lenient.add(&db).unwrap().max_staff, 0);

        let mut strict = DepartmentManager::new(NumericPolicy::Reject);
        strict.form = DepartmentForm {
            dept_code: "PB002".to_string(),
            dept_name: "Sales".to_string(),
            max_staff: "ten".to_string(),
            ..finance_form()
        };
        assert!(matches!(
            strict.add(&db),
            Err(DeskError::NotANumber { field: "max_staff", .. })
        ));
    }

    #[test]
    fn test_update_requires_selection() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        assert!(matches!(
            mgr.update(&db),
            Err(DeskError::NoSelection("department"))
        ));
    }

    #[test]
    fn test_update_preserves_identity() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        let added = mgr.add(&db).unwrap();

        mgr.select(&db, "PB001").unwrap();
        assert_eq!(mgr.selected(), Some("PB001"));
        assert_eq!(mgr.form.max_staff, "10");
        mgr.form.dept_name = "Phòng Kế Toán".to_string();
        mgr.update(&db).unwrap();

        let stored = db.get_department_by_code("PB001").unwrap().unwrap();
        assert_eq!(stored.id, added.id);
        assert_eq!(stored.created_date, added.created_date);
        assert_eq!(stored.dept_name, "Phòng Kế Toán");
        assert_eq!(mgr.selected(), None);
    }

    #[test]
    fn test_delete_without_dependents_skips_prompt() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        mgr.add(&db).unwrap();
        mgr.select(&db, "PB001").unwrap();

        let outcome = mgr
            .delete(&db, |_| panic!("no dependents, no prompt"))
            .unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(s) if s.departments == 1));
        assert!(mgr.rows().is_empty());
    }

    #[test]
    fn test_delete_with_staff_prompts_and_can_cancel() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        let dept = mgr.add(&db).unwrap();
        for code in ["NV001", "NV002", "NV003"] {
            staff_in(&db, &dept.id, code);
        }
        mgr.select(&db, "PB001").unwrap();

        let mut seen = None;
        let outcome = mgr
            .delete(&db, |prompt| {
                seen = Some(prompt.clone());
                false
            })
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(seen.unwrap().dependents, 3);
        assert_eq!(db.count(Table::Staff).unwrap(), 3);

        let outcome = mgr.delete(&db, |_| true).unwrap();
        match outcome {
            DeleteOutcome::Deleted(summary) => assert_eq!(summary.staff, 3),
            other => panic!("expected delete, got {other:?}"),
        }
        assert_eq!(db.count(Table::Staff).unwrap(), 0);
        assert_eq!(db.count(Table::Departments).unwrap(), 0);
    }

    #[test]
    fn test_search_matches_manager_case_insensitively() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        mgr.add(&db).unwrap();
        mgr.form = DepartmentForm {
            dept_code: "PB002".to_string(),
            dept_name: "Sales".to_string(),
            manager: "Trần Thị B".to_string(),
            ..Default::default()
        };
        mgr.add(&db).unwrap();

        mgr.search(&db, "SALES").unwrap();
        assert_eq!(mgr.rows().len(), 1);
        assert_eq!(mgr.rows()[0].dept_code, "PB002");

        mgr.search(&db, "").unwrap();
        assert_eq!(mgr.rows().len(), 2);
    }

    #[test]
    fn test_update_to_taken_code_keeps_form() {
        let db = test_db();
        let mut mgr = DepartmentManager::new(NumericPolicy::default());
        mgr.form = finance_form();
        mgr.add(&db).unwrap();
        mgr.form = DepartmentForm {
            dept_code: "PB002".to_string(),
            dept_name: "Phòng Kinh Doanh".to_string(),
            ..finance_form()
        };
        mgr.add(&db).unwrap();

        mgr.select(&db, "PB002").unwrap();
        mgr.form.dept_code = "PB001".to_string();
        let err = mgr.update(&db).unwrap_err();
        assert!(matches!(err, DeskError::DuplicateCode { entity: "Department" }));
        assert!(err.keeps_form());
        assert_eq!(mgr.form.dept_code, "PB001");
        assert_eq!(mgr.selected(), Some("PB002"));
        assert!(db.get_department_by_code("PB002").unwrap().is_some());
    }
}
