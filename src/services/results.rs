// Result service
// Records measured KPI values. Results are append-only.

use serde::{Deserialize, Serialize};

use crate::db::{DbKpiResult, RecordStore, ResultListRow};
use crate::error::DeskError;

use super::form;

/// Editable result fields. `kpi` is a `"CODE - Name"` display value or a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultForm {
    pub kpi: String,
    pub period: String,
    pub actual_value: String,
    pub note: String,
}

impl Default for ResultForm {
    fn default() -> Self {
        Self {
            kpi: String::new(),
            period: current_period(),
            actual_value: String::new(),
            note: String::new(),
        }
    }
}

/// The current month as `YYYY-MM`.
pub fn current_period() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

/// Achievement in percent. A zero or negative target yields zero.
pub fn achievement_percentage(actual: f64, target: f64) -> f64 {
    if target > 0.0 {
        actual / target * 100.0
    } else {
        0.0
    }
}

#[derive(Default)]
pub struct ResultDesk {
    pub form: ResultForm,
    rows: Vec<ResultListRow>,
    kpi_filter: Option<String>,
}

impl ResultDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results, most recent first.
    pub fn rows(&self) -> &[ResultListRow] {
        &self.rows
    }

    pub fn kpi_filter(&self) -> Option<&str> {
        self.kpi_filter.as_deref()
    }

    /// Store the result in the form and reset the form for the next entry.
    pub fn record(&mut self, db: &RecordStore, recorded_by: &str) -> Result<DbKpiResult, DeskError> {
        let kpi_display = form::require("kpi", &self.form.kpi)?;
        let raw_actual = form::require("actual_value", &self.form.actual_value)?;
        let actual_value = match raw_actual.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                return Err(DeskError::NotANumber {
                    field: "actual_value",
                    value: raw_actual,
                })
            }
        };

        let kpi_code = form::code_from_display(&kpi_display);
        let kpi = db
            .get_kpi_by_code(kpi_code)?
            .ok_or_else(|| DeskError::ReferenceNotFound {
                entity: "KPI",
                key: kpi_code.to_string(),
            })?;
        let period = match self.form.period.trim() {
            "" => current_period(),
            p => p.to_string(),
        };

        let record = DbKpiResult {
            id: form::new_id(),
            kpi_id: kpi.id,
            period,
            actual_value,
            achievement_percentage: achievement_percentage(actual_value, kpi.target_value),
            note: self.form.note.trim().to_string(),
            recorded_by: recorded_by.to_string(),
            recorded_date: form::now_timestamp(),
        };
        db.insert(&record)?;
        log::info!(
            "Recorded {} for KPI {} ({:.1}%)",
            record.period,
            kpi.kpi_code,
            record.achievement_percentage
        );

        self.refresh(db)?;
        self.form = ResultForm::default();
        Ok(record)
    }

    /// Show results of one KPI (display value or code), or all with `None`.
    pub fn set_kpi_filter(&mut self, db: &RecordStore, kpi: Option<String>) -> Result<(), DeskError> {
        self.kpi_filter = kpi
            .as_deref()
            .map(form::code_from_display)
            .filter(|code| !code.is_empty())
            .map(str::to_string);
        self.refresh(db)
    }

    pub fn refresh(&mut self, db: &RecordStore) -> Result<(), DeskError> {
        self.rows = db.list_results(self.kpi_filter.as_deref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::Table;

    fn setup() -> RecordStore {
        let db = test_db();
        db.conn_ref()
            .execute_batch(
                "INSERT INTO kpi (id, kpi_code, kpi_name, target_value, status)
                 VALUES ('k1', 'KPI001', 'Revenue', 100.0, 'active');
                 INSERT INTO kpi (id, kpi_code, kpi_name, target_value, status)
                 VALUES ('k2', 'KPI002', 'Untargeted', 0.0, 'active');",
            )
            .unwrap();
        db
    }

    fn desk_with(kpi: &str, period: &str, actual: &str) -> ResultDesk {
        let mut desk = ResultDesk::new();
        desk.form = ResultForm {
            kpi: kpi.to_string(),
            period: period.to_string(),
            actual_value: actual.to_string(),
            note: String::new(),
        };
        desk
    }

    #[test]
    fn test_achievement_percentage() {
        assert_eq!(achievement_percentage(95.0, 100.0), 95.0);
        assert_eq!(achievement_percentage(50.0, 0.0), 0.0);
        assert_eq!(achievement_percentage(50.0, -10.0), 0.0);
    }

    #[test]
    fn test_record_computes_achievement() {
        let db = setup();
        let mut desk = desk_with("KPI001 - Revenue", "2024-01", "95");

        let result = desk.record(&db, "Lan").unwrap();
        assert_eq!(result.achievement_percentage, 95.0);
        assert_eq!(result.recorded_by, "Lan");
        assert_eq!(result.period, "2024-01");
        assert_eq!(desk.rows().len(), 1);
        assert_eq!(desk.rows()[0].target_value, 100.0);
        assert_eq!(desk.form.period, current_period());
    }

    #[test]
    fn test_zero_target_gives_zero_achievement() {
        let db = setup();
        let mut desk = desk_with("KPI002", "2024-01", "42");
        assert_eq!(desk.record(&db, "System").unwrap().achievement_percentage, 0.0);
    }

    #[test]
    fn test_blank_period_defaults_to_current_month() {
        let db = setup();
        let mut desk = desk_with("KPI001", "  ", "10");
        assert_eq!(desk.record(&db, "System").unwrap().period, current_period());
    }

    #[test]
    fn test_actual_value_must_be_numeric() {
        let db = setup();
        let mut desk = desk_with("KPI001", "2024-01", "ninety");
        let err = desk.record(&db, "System").unwrap_err();
        assert!(matches!(err, DeskError::NotANumber { field: "actual_value", .. }));
        assert_eq!(desk.form.actual_value, "ninety");

        let mut desk = desk_with("KPI001", "2024-01", "");
        assert!(matches!(
            desk.record(&db, "System"),
            Err(DeskError::MissingField("actual_value"))
        ));
        assert_eq!(db.count(Table::KpiResults).unwrap(), 0);
    }

    #[test]
    fn test_kpi_filter() {
        let db = setup();
        desk_with("KPI001", "2024-01", "10").record(&db, "System").unwrap();
        desk_with("KPI002", "2024-01", "10").record(&db, "System").unwrap();

        let mut desk = ResultDesk::new();
        desk.set_kpi_filter(&db, Some("KPI002 - Untargeted".to_string()))
            .unwrap();
        assert_eq!(desk.rows().len(), 1);
        assert_eq!(desk.rows()[0].kpi_code, "KPI002");

        desk.set_kpi_filter(&db, None).unwrap();
        assert_eq!(desk.rows().len(), 2);
    }
}
