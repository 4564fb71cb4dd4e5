// Staff service
// Form, selection and list state behind the staff tab. Staff always belong
// to a department, picked by name.

use serde::{Deserialize, Serialize};

use crate::db::{DbStaff, Match, RecordStore, StaffListRow};
use crate::error::DeskError;

use super::form::{self, DeleteOutcome, DeletePrompt};

const ENTITY: &str = "Staff";

pub const GENDERS: [&str; 2] = ["Nam", "Nữ"];

pub const POSITIONS: [&str; 8] = [
    "Giám đốc",
    "Phó giám đốc",
    "Trưởng phòng",
    "Phó trưởng phòng",
    "Chuyên viên chính",
    "Chuyên viên",
    "Nhân viên",
    "Thực tập sinh",
];

pub const EDUCATION_LEVELS: [&str; 6] = [
    "Tiến sĩ",
    "Thạc sĩ",
    "Đại học",
    "Cao đẳng",
    "Trung cấp",
    "THPT",
];

pub const STAFF_STATUSES: [&str; 3] = ["active", "inactive", "on_leave"];

/// Editable staff fields exactly as typed. `department` holds the
/// department's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffForm {
    pub staff_code: String,
    pub full_name: String,
    pub birth_date: String,
    pub gender: String,
    pub id_number: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub department: String,
    pub position: String,
    pub education: String,
    pub basic_salary: String,
    pub start_date: String,
    pub status: String,
}

impl Default for StaffForm {
    fn default() -> Self {
        Self {
            staff_code: String::new(),
            full_name: String::new(),
            birth_date: String::new(),
            gender: GENDERS[0].to_string(),
            id_number: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            department: String::new(),
            position: POSITIONS[0].to_string(),
            education: EDUCATION_LEVELS[0].to_string(),
            basic_salary: String::new(),
            start_date: String::new(),
            status: STAFF_STATUSES[0].to_string(),
        }
    }
}

impl StaffForm {
    pub fn from_record(staff: &DbStaff, dept_name: Option<String>) -> Self {
        Self {
            staff_code: staff.staff_code.clone(),
            full_name: staff.full_name.clone(),
            birth_date: staff.birth_date.clone(),
            gender: staff.gender.clone(),
            id_number: staff.id_number.clone(),
            phone: staff.phone.clone(),
            email: staff.email.clone(),
            address: staff.address.clone(),
            department: dept_name.unwrap_or_default(),
            position: staff.position.clone(),
            education: staff.education.clone(),
            basic_salary: staff.basic_salary.clone(),
            start_date: staff.start_date.clone(),
            status: staff.status.clone(),
        }
    }

    fn to_record(
        &self,
        db: &RecordStore,
        id: String,
        created_date: String,
    ) -> Result<DbStaff, DeskError> {
        let staff_code = form::require("staff_code", &self.staff_code)?;
        let full_name = form::require("full_name", &self.full_name)?;
        let department = form::require("department_id", &self.department)?;
        let position = form::require("position", &self.position)?;
        let department_id =
            db.department_id_by_name(&department)?
                .ok_or(DeskError::ReferenceNotFound {
                    entity: "Department",
                    key: department,
                })?;
        let status = match self.status.trim() {
            "" => STAFF_STATUSES[0].to_string(),
            s => s.to_string(),
        };
        Ok(DbStaff {
            id,
            staff_code,
            full_name,
            birth_date: self.birth_date.trim().to_string(),
            gender: self.gender.trim().to_string(),
            id_number: self.id_number.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            department_id,
            position,
            education: self.education.trim().to_string(),
            basic_salary: self.basic_salary.trim().to_string(),
            start_date: self.start_date.trim().to_string(),
            status,
            created_date,
        })
    }
}

pub struct StaffManager {
    pub form: StaffForm,
    selected: Option<String>,
    rows: Vec<StaffListRow>,
    search: String,
    dept_filter: Option<String>,
}

impl Default for StaffManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StaffManager {
    pub fn new() -> Self {
        Self {
            form: StaffForm::default(),
            selected: None,
            rows: Vec::new(),
            search: String::new(),
            dept_filter: None,
        }
    }

    pub fn rows(&self) -> &[StaffListRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn department_filter(&self) -> Option<&str> {
        self.dept_filter.as_deref()
    }

    pub fn select(&mut self, db: &RecordStore, code: &str) -> Result<(), DeskError> {
        let staff = db.get_staff_by_code(code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.to_string(),
        })?;
        let dept_name = db.staff_department_name(&staff.id)?;
        self.form = StaffForm::from_record(&staff, dept_name);
        self.selected = Some(staff.staff_code);
        Ok(())
    }

    pub fn add(&mut self, db: &RecordStore) -> Result<DbStaff, DeskError> {
        let record = self
            .form
            .to_record(db, form::new_id(), form::now_timestamp())?;
        db.insert(&record)
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Added staff {} ({})", record.staff_code, record.full_name);

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    pub fn update(&mut self, db: &RecordStore) -> Result<DbStaff, DeskError> {
        let code = self
            .selected
            .clone()
            .ok_or(DeskError::NoSelection("staff member"))?;
        let existing = db.get_staff_by_code(&code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.clone(),
        })?;
        let record = self
            .form
            .to_record(db, existing.id, existing.created_date)?;
        db.update(&record, &Match::new("staff_code", code.clone()))
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Updated staff {code}");

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    /// Delete the selected staff member and their KPI assignments. Results
    /// belong to KPIs and are kept.
    pub fn delete(
        &mut self,
        db: &RecordStore,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let code = self
            .selected
            .clone()
            .ok_or(DeskError::NoSelection("staff member"))?;
        let staff = db.get_staff_by_code(&code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.clone(),
        })?;

        let dependents = db.count_staff_assignments(&staff.id)?;
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

        let summary = db.delete_staff_cascade(&staff.id)?;
        log::info!(
            "Deleted staff {code} with {} assignments",
            summary.assignments
        );

        self.refresh(db)?;
        self.clear_form();
        Ok(DeleteOutcome::Deleted(summary))
    }

    pub fn clear_form(&mut self) {
        self.form = StaffForm::default();
        self.selected = None;
    }

    pub fn search(&mut self, db: &RecordStore, term: &str) -> Result<(), DeskError> {
        self.search = term.to_string();
        self.refresh(db)
    }

    /// Narrow the list to one department by name; `None` shows every department.
    pub fn set_department_filter(
        &mut self,
        db: &RecordStore,
        dept_name: Option<String>,
    ) -> Result<(), DeskError> {
        self.dept_filter = dept_name.filter(|d| !d.trim().is_empty());
        self.refresh(db)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_staff(&self.search, self.dept_filter.as_deref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{sample_department, test_db};
    use crate::db::{DbKpiAssignment, Table};

    fn setup() -> RecordStore {
        let db = test_db();
        db.insert(&sample_department("d1", "PB001", "Phòng Tài Chính"))
            .unwrap();
        db.insert(&sample_department("d2", "PB002", "Phòng Kinh Doanh"))
            .unwrap();
        db
    }

    fn staff_form(code: &str, name: &str, dept: &str) -> StaffForm {
        StaffForm {
            staff_code: code.to_string(),
            full_name: name.to_string(),
            department: dept.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_clear_form_restores_defaults() {
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");
        mgr.clear_form();
        assert_eq!(mgr.form.gender, "Nam");
        assert_eq!(mgr.form.position, "Giám đốc");
        assert_eq!(mgr.form.education, "Tiến sĩ");
        assert_eq!(mgr.form.status, "active");
        assert!(mgr.form.staff_code.is_empty());
    }

    #[test]
    fn test_add_with_empty_salary() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");

        let added = mgr.add(&db).unwrap();
        assert_eq!(added.department_id, "d1");
        assert_eq!(added.basic_salary, "");
        assert_eq!(mgr.rows().len(), 1);
        assert_eq!(mgr.rows()[0].dept_name, "Phòng Tài Chính");
    }

    #[test]
    fn test_unknown_department_is_reference_error() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Không Tồn Tại");

        let err = mgr.add(&db).unwrap_err();
        assert!(matches!(err, DeskError::ReferenceNotFound { entity: "Department", .. }));
        assert_eq!(db.count(Table::Staff).unwrap(), 0);
    }

    #[test]
    fn test_missing_department_is_validation_error() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", " ");
        assert!(matches!(
            mgr.add(&db),
            Err(DeskError::MissingField("department_id"))
        ));
    }

    #[test]
    fn test_select_loads_department_name() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Kinh Doanh");
        mgr.add(&db).unwrap();

        mgr.select(&db, "NV001").unwrap();
        assert_eq!(mgr.form.department, "Phòng Kinh Doanh");
        assert_eq!(mgr.selected(), Some("NV001"));

        mgr.form.department = "Phòng Tài Chính".to_string();
        mgr.update(&db).unwrap();
        let stored = db.get_staff_by_code("NV001").unwrap().unwrap();
        assert_eq!(stored.department_id, "d1");
    }

    #[test]
    fn test_department_filter_narrows_list() {
        let db = setup();
        let mut mgr = StaffManager::new();
        for (code, dept) in [
            ("NV001", "Phòng Tài Chính"),
            ("NV002", "Phòng Kinh Doanh"),
            ("NV003", "Phòng Kinh Doanh"),
        ] {
            mgr.form = staff_form(code, &format!("Person {code}"), dept);
            mgr.add(&db).unwrap();
        }

        mgr.set_department_filter(&db, Some("Phòng Kinh Doanh".to_string()))
            .unwrap();
        assert_eq!(mgr.rows().len(), 2);

        mgr.search(&db, "nv003").unwrap();
        assert_eq!(mgr.rows().len(), 1);

        mgr.search(&db, "").unwrap();
        mgr.set_department_filter(&db, None).unwrap();
        assert_eq!(mgr.rows().len(), 3);
    }

    #[test]
    fn test_delete_removes_assignments() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");
        let staff = mgr.add(&db).unwrap();
        db.conn_ref()
            .execute(
                "INSERT INTO kpi (id, kpi_code, kpi_name) VALUES ('k1', 'KPI001', 'Revenue')",
                [],
            )
            .unwrap();
        db.insert(&DbKpiAssignment {
            id: "a1".to_string(),
            kpi_id: "k1".to_string(),
            staff_id: staff.id.clone(),
            assigned_date: form::now_timestamp(),
            role: "owner".to_string(),
        })
        .unwrap();

        mgr.select(&db, "NV001").unwrap();
        let mut prompted = false;
        let outcome = mgr
            .delete(&db, |p| {
                prompted = p.dependents == 1;
                true
            })
            .unwrap();
        assert!(prompted);
        assert!(matches!(outcome, DeleteOutcome::Deleted(s) if s.assignments == 1 && s.staff == 1));
        assert_eq!(db.count(Table::KpiAssignments).unwrap(), 0);
        assert_eq!(db.count(Table::Kpi).unwrap(), 1);
    }

    #[test]
    fn test_delete_requires_selection() {
        let db = setup();
        let mut mgr = StaffManager::new();
        assert!(matches!(
            mgr.delete(&db, |_| true),
            Err(DeskError::NoSelection(_))
        ));
    }

    #[test]
    fn test_update_requires_selection() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");
        assert!(matches!(
            mgr.update(&db),
            Err(DeskError::NoSelection("staff member"))
        ));
        assert_eq!(db.count(Table::Staff).unwrap(), 0);
    }

    #[test]
    fn test_update_preserves_identity_and_moves_department() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");
        let added = mgr.add(&db).unwrap();

        mgr.select(&db, "NV001").unwrap();
        assert_eq!(mgr.form.department, "Phòng Tài Chính");
        mgr.form.department = "Phòng Kinh Doanh".to_string();
        mgr.form.full_name = "Lê Văn Cường".to_string();
        mgr.update(&db).unwrap();

        let stored = db.get_staff_by_code("NV001").unwrap().unwrap();
        assert_eq!(stored.id, added.id);
        assert_eq!(stored.created_date, added.created_date);
        assert_eq!(stored.department_id, "d2");
        assert_eq!(stored.full_name, "Lê Văn Cường");
        assert_eq!(mgr.selected(), None);
    }

    #[test]
    fn test_update_to_taken_code_keeps_form() {
        let db = setup();
        let mut mgr = StaffManager::new();
        mgr.form = staff_form("NV001", "Lê Văn C", "Phòng Tài Chính");
        mgr.add(&db).unwrap();
        mgr.form = staff_form("NV002", "Trần Thị D", "Phòng Kinh Doanh");
        mgr.add(&db).unwrap();

        mgr.select(&db, "NV002").unwrap();
        mgr.form.staff_code = "NV001".to_string();
        let err = mgr.update(&db).unwrap_err();
        assert!(matches!(err, DeskError::DuplicateCode { entity: "Staff" }));
        assert!(err.keeps_form());
        assert_eq!(mgr.form.staff_code, "NV001");
        assert_eq!(mgr.selected(), Some("NV002"));
        assert!(db.get_staff_by_code("NV002").unwrap().is_some());
    }
}
