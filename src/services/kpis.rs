// KPI service
// Form, selection and list state behind the KPI tab. Category and department
// are optional and picked by name.

use serde::{Deserialize, Serialize};

use crate::db::kpis::KpiWithNames;
use crate::db::{DbKpi, KpiListRow, Match, RecordStore};
use crate::error::DeskError;
use crate::types::NumericPolicy;

use super::form::{self, DeleteOutcome, DeletePrompt};

const ENTITY: &str = "KPI";

pub const KPI_UNITS: [&str; 8] = ["VND", "USD", "%", "Số lượng", "Tỷ lệ", "Điểm", "Giờ", "Ngày"];

pub const KPI_FREQUENCIES: [&str; 5] = [
    "Hàng ngày",
    "Hàng tuần",
    "Hàng tháng",
    "Hàng quý",
    "Hàng năm",
];

pub const KPI_STATUSES: [&str; 3] = ["active", "inactive", "draft"];

/// Editable KPI fields exactly as typed. `category` and `department` hold
/// display names and may be blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiForm {
    pub kpi_code: String,
    pub kpi_name: String,
    pub description: String,
    pub category: String,
    pub department: String,
    pub unit: String,
    pub target_value: String,
    pub weight: String,
    pub measurement_frequency: String,
    pub status: String,
}

impl Default for KpiForm {
    fn default() -> Self {
        Self {
            kpi_code: String::new(),
            kpi_name: String::new(),
            description: String::new(),
            category: String::new(),
            department: String::new(),
            unit: KPI_UNITS[0].to_string(),
            target_value: String::new(),
            weight: String::new(),
            measurement_frequency: KPI_FREQUENCIES[0].to_string(),
            status: KPI_STATUSES[0].to_string(),
        }
    }
}

impl KpiForm {
    pub fn from_record(loaded: &KpiWithNames) -> Self {
        let kpi = &loaded.kpi;
        Self {
            kpi_code: kpi.kpi_code.clone(),
            kpi_name: kpi.kpi_name.clone(),
            description: kpi.description.clone(),
            category: loaded.category_name.clone().unwrap_or_default(),
            department: loaded.dept_name.clone().unwrap_or_default(),
            unit: kpi.unit.clone(),
            target_value: form::number_field(kpi.target_value),
            weight: form::number_field(kpi.weight),
            measurement_frequency: kpi.measurement_frequency.clone(),
            status: if kpi.status.is_empty() {
                KPI_STATUSES[0].to_string()
            } else {
                kpi.status.clone()
            },
        }
    }

    fn to_record(
        &self,
        db: &RecordStore,
        policy: NumericPolicy,
        id: String,
        created_date: String,
    ) -> Result<DbKpi, DeskError> {
        let kpi_code = form::require("kpi_code", &self.kpi_code)?;
        let kpi_name = form::require("kpi_name", &self.kpi_name)?;
        let target_value = form::parse_decimal(policy, "target_value", &self.target_value)?;
        let weight = form::parse_decimal(policy, "weight", &self.weight)?;

        let category_id = match self.category.trim() {
            "" => None,
            name => Some(db.category_id_by_name(name)?.ok_or_else(|| {
                DeskError::ReferenceNotFound {
                    entity: "Category",
                    key: name.to_string(),
                }
            })?),
        };
        let department_id = match self.department.trim() {
            "" => None,
            name => Some(db.department_id_by_name(name)?.ok_or_else(|| {
                DeskError::ReferenceNotFound {
                    entity: "Department",
                    key: name.to_string(),
                }
            })?),
        };

        Ok(DbKpi {
            id,
            kpi_code,
            kpi_name,
            description: self.description.trim().to_string(),
            category_id,
            department_id,
            unit: self.unit.trim().to_string(),
            target_value,
            weight,
            measurement_frequency: self.measurement_frequency.trim().to_string(),
            created_date,
            status: match self.status.trim() {
                "" => KPI_STATUSES[0].to_string(),
                s => s.to_string(),
            },
        })
    }
}

pub struct KpiManager {
    pub form: KpiForm,
    selected: Option<String>,
    rows: Vec<KpiListRow>,
    search: String,
    dept_filter: Option<String>,
    policy: NumericPolicy,
}

impl KpiManager {
    pub fn new(policy: NumericPolicy) -> Self {
        Self {
            form: KpiForm::default(),
            selected: None,
            rows: Vec::new(),
            search: String::new(),
            dept_filter: None,
            policy,
        }
    }

    pub fn rows(&self) -> &[KpiListRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn department_filter(&self) -> Option<&str> {
        self.dept_filter.as_deref()
    }

    pub fn select(&mut self, db: &RecordStore, code: &str) -> Result<(), DeskError> {
        let loaded = db.get_kpi_with_names(code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.to_string(),
        })?;
        self.form = KpiForm::from_record(&loaded);
        self.selected = Some(loaded.kpi.kpi_code);
        Ok(())
    }

    pub fn add(&mut self, db: &RecordStore) -> Result<DbKpi, DeskError> {
        let record =
            self.form
                .to_record(db, self.policy, form::new_id(), form::now_timestamp())?;
        db.insert(&record)
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Added KPI {} ({})", record.kpi_code, record.kpi_name);

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    pub fn update(&mut self, db: &RecordStore) -> Result<DbKpi, DeskError> {
        let code = self.selected.clone().ok_or(DeskError::NoSelection("KPI"))?;
        let existing = db.get_kpi_by_code(&code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.clone(),
        })?;
        let record =
            self.form
                .to_record(db, self.policy, existing.id, existing.created_date)?;
        db.update(&record, &Match::new("kpi_code", code.clone()))
            .map_err(|e| DeskError::from_write(ENTITY, e))?;
        log::info!("Updated KPI {code}");

        self.refresh(db)?;
        self.clear_form();
        Ok(record)
    }

    /// Delete the selected KPI with its assignments and results.
    pub fn delete(
        &mut self,
        db: &RecordStore,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let code = self.selected.clone().ok_or(DeskError::NoSelection("KPI"))?;
        let kpi = db.get_kpi_by_code(&code)?.ok_or_else(|| DeskError::NotFound {
            entity: ENTITY,
            code: code.clone(),
        })?;

        let dependents = db.count_kpi_dependents(&kpi.id)?;
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

        let summary = db.delete_kpi_cascade(&kpi.id)?;
        log::info!(
            "Deleted KPI {code}: {} assignments, {} results",
            summary.assignments,
            summary.results
        );

        self.refresh(db)?;
        self.clear_form();
        Ok(DeleteOutcome::Deleted(summary))
    }

    pub fn clear_form(&mut self) {
        self.form = KpiForm::default();
        self.selected = None;
    }

    pub fn search(&mut self, db: &RecordStore, term: &str) -> Result<(), DeskError> {
        self.search = term.to_string();
        self.refresh(db)
    }

    pub fn set_department_filter(
        &mut self,
        db: &RecordStore,
        dept_name: Option<String>,
    ) -> Result<(), DeskError> {
        self.dept_filter = dept_name.filter(|d| !d.trim().is_empty());
        self.refresh(db)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_kpis(&self.search, self.dept_filter.as_deref())?;
        Ok(())
    }
}
