// Assignment service
// Links KPIs to staff members with a role. KPIs and staff are picked from
// `"CODE - Name"` lists; a bare code works too.

use serde::{Deserialize, Serialize};

use crate::db::{AssignmentListRow, AssignmentRole, DbKpiAssignment, RecordStore};
use crate::error::DeskError;

use super::form;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentForm {
    pub kpi: String,
    pub staff: String,
    pub role: String,
}

impl Default for AssignmentForm {
    fn default() -> Self {
        Self {
            kpi: String::new(),
            staff: String::new(),
            role: AssignmentRole::default().as_str().to_string(),
        }
    }
}

#[derive(Default)]
pub struct AssignmentDesk {
    pub form: AssignmentForm,
    rows: Vec<AssignmentListRow>,
}

impl AssignmentDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignments, most recent first.
    pub fn rows(&self) -> &[AssignmentListRow] {
        &self.rows
    }

    /// Assign the KPI and staff member in the form. The form is kept so the
    /// same KPI can be handed to several people in a row.
    pub fn assign(&mut self, db: &RecordStore) -> Result<DbKpiAssignment, DeskError> {
        let kpi = self.form.kpi.trim();
        let staff = self.form.staff.trim();
        if kpi.is_empty() || staff.is_empty() {
            return Err(DeskError::NoSelection("KPI and staff member"));
        }
        let role = AssignmentRole::parse(&self.form.role).ok_or_else(|| DeskError::InvalidChoice {
            field: "role",
            value: self.form.role.clone(),
        })?;

        let (kpi_id, staff_id) = resolve_pair(db, kpi, staff)?;
        if db.assignment_exists(&kpi_id, &staff_id)? {
            return Err(DeskError::DuplicateAssignment);
        }

        let record = DbKpiAssignment {
            id: form::new_id(),
            kpi_id,
            staff_id,
            assigned_date: form::now_timestamp(),
            role: role.as_str().to_string(),
        };
        db.insert(&record)?;
        log::info!(
            "Assigned KPI {} to staff {} as {}",
            form::code_from_display(kpi),
            form::code_from_display(staff),
            record.role
        );

        self.refresh(db)?;
        Ok(record)
    }

    /// Remove the assignment linking `kpi_code` and `staff_code`. Returns the
    /// number of rows removed.
    pub fn unassign(
        &mut self,
        db: &RecordStore,
        kpi_code: &str,
        staff_code: &str,
    ) -> Result<usize, DeskError> {
        let (kpi_id, staff_id) = resolve_pair(db, kpi_code, staff_code)?;
        let removed = db.delete_assignment_pair(&kpi_id, &staff_id)?;
        log::info!("Unassigned KPI {kpi_code} from staff {staff_code}");

        self.refresh(db)?;
        Ok(removed)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_assignments()?;
        Ok(())
    }
}

/// Resolve KPI and staff display values (or codes) to their ids.
fn resolve_pair(db: &RecordStore, kpi: &str, staff: &str) -> Result<(String, String), DeskError> {
    let kpi_code = form::code_from_display(kpi);
    let staff_code = form::code_from_display(staff);
    let kpi = db
        .get_kpi_by_code(kpi_code)?
        .ok_or_else(|| DeskError::ReferenceNotFound {
            entity: "KPI",
            key: kpi_code.to_string(),
        })?;
    let staff = db
        .get_staff_by_code(staff_code)?
        .ok_or_else(|| DeskError::ReferenceNotFound {
            entity: "Staff",
            key: staff_code.to_string(),
        })?;
    Ok((kpi.id, staff.id))
}
