use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::db::{RecordStore, Table};
use crate::db_backup;
use crate::error::DeskError;
use crate::services::{
    AssignmentDesk, CategoryDesk, DeleteOutcome, DeletePrompt, DepartmentManager, KpiManager,
    ResultDesk, StaffManager,
};
use crate::types::Config;

/// What changed in the store after a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataChange {
    Departments,
    Staff,
    Kpis,
    Categories,
    Assignments,
    Results,
    /// The whole store was replaced from a backup.
    Restored,
}

/// Values offered by the pick lists of every form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickLists {
    pub department_names: Vec<String>,
    pub category_names: Vec<String>,
    /// `"CODE - Name"` of every active KPI.
    pub kpi_displays: Vec<String>,
    /// `"CODE - Full Name"` of every active staff member.
    pub staff_displays: Vec<String>,
}

type Observer = Box<dyn FnMut(DataChange)>;

/// Owns the record store and every tab's state. After each successful
/// mutation all lists and pick lists are reloaded, then observers are told
/// what changed.
pub struct DeskState {
    db: RecordStore,
    config: Config,
    pub departments: DepartmentManager,
    pub staff: StaffManager,
    pub kpis: KpiManager,
    pub categories: CategoryDesk,
    pub assignments: AssignmentDesk,
    pub results: ResultDesk,
    picks: PickLists,
    observers: Vec<Observer>,
}

impl DeskState {
    /// Open the configured store (seeding sample rows if enabled) and load
    /// every list.
    pub fn new(config: Config) -> Result<Self, DeskError> {
        let db = match &config.db_path {
            Some(path) => RecordStore::open_at(path.clone())?,
            None => RecordStore::open()?,
        };
        if config.seed_sample_data {
            if let Err(e) = db.load_sample_data() {
                log::warn!("Sample data not installed: {e}");
            }
        }
        Self::with_store(db, config)
    }

    pub fn with_store(db: RecordStore, config: Config) -> Result<Self, DeskError> {
        let policy = config.numeric_policy;
        let mut state = Self {
            db,
            config,
            departments: DepartmentManager::new(policy),
            staff: StaffManager::new(),
            kpis: KpiManager::new(policy),
            categories: CategoryDesk::new(),
            assignments: AssignmentDesk::new(),
            results: ResultDesk::new(),
            picks: PickLists::default(),
            observers: Vec::new(),
        };
        state.refresh_all()?;
        Ok(state)
    }

    pub fn db(&self) -> &RecordStore {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pick_lists(&self) -> &PickLists {
        &self.picks
    }

    /// Register a callback run after every successful mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(DataChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Reload every list and pick list from the store.
    pub fn refresh_all(&mut self) -> Result<(), DeskError> {
        self.departments.refresh(&self.db)?;
        self.staff.refresh(&self.db)?;
        self.kpis.refresh(&self.db)?;
        self.categories.refresh(&self.db)?;
        self.assignments.refresh(&self.db)?;
        self.results.refresh(&self.db)?;
        self.picks = PickLists {
            department_names: self.db.active_department_names()?,
            category_names: self.db.category_names()?,
            kpi_displays: self.db.active_kpi_displays()?,
            staff_displays: self.db.active_staff_displays()?,
        };
        Ok(())
    }

    fn settle<T>(
        &mut self,
        change: DataChange,
        outcome: Result<T, DeskError>,
    ) -> Result<T, DeskError> {
        match outcome {
            Ok(value) => {
                // The write is committed; a failed reload only leaves stale lists.
                if let Err(e) = self.refresh_all() {
                    log::warn!("Reload after {change:?} change failed: {e}");
                }
                for observer in &mut self.observers {
                    observer(change);
                }
                Ok(value)
            }
            Err(e) => {
                log::warn!("{change:?} operation rejected: {e}");
                Err(e)
            }
        }
    }

    fn settle_delete(
        &mut self,
        change: DataChange,
        outcome: Result<DeleteOutcome, DeskError>,
    ) -> Result<DeleteOutcome, DeskError> {
        match outcome {
            Ok(DeleteOutcome::Cancelled) => Ok(DeleteOutcome::Cancelled),
            other => self.settle(change, other),
        }
    }

    // =========================================================================
    // Selection and filters (no data changes, no notifications)
    // =========================================================================

    pub fn select_department(&mut self, code: &str) -> Result<(), DeskError> {
        self.departments.select(&self.db, code)
    }

    pub fn select_staff(&mut self, code: &str) -> Result<(), DeskError> {
        self.staff.select(&self.db, code)
    }

    pub fn select_kpi(&mut self, code: &str) -> Result<(), DeskError> {
        self.kpis.select(&self.db, code)
    }

    pub fn search_departments(&mut self, term: &str) -> Result<(), DeskError> {
        self.departments.search(&self.db, term)
    }

    pub fn search_staff(&mut self, term: &str) -> Result<(), DeskError> {
        self.staff.search(&self.db, term)
    }

    pub fn search_kpis(&mut self, term: &str) -> Result<(), DeskError> {
        self.kpis.search(&self.db, term)
    }

    pub fn filter_staff_by_department(&mut self, dept_name: Option<String>) -> Result<(), DeskError> {
        self.staff.set_department_filter(&self.db, dept_name)
    }

    pub fn filter_kpis_by_department(&mut self, dept_name: Option<String>) -> Result<(), DeskError> {
        self.kpis.set_department_filter(&self.db, dept_name)
    }

    pub fn filter_results_by_kpi(&mut self, kpi: Option<String>) -> Result<(), DeskError> {
        self.results.set_kpi_filter(&self.db, kpi)
    }

    // =========================================================================
    // Departments
    // =========================================================================

    pub fn add_department(&mut self) -> Result<(), DeskError> {
        let outcome = self.departments.add(&self.db).map(|_| ());
        self.settle(DataChange::Departments, outcome)
    }

    pub fn update_department(&mut self) -> Result<(), DeskError> {
        let outcome = self.departments.update(&self.db).map(|_| ());
        self.settle(DataChange::Departments, outcome)
    }

    pub fn delete_department(
        &mut self,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let outcome = self.departments.delete(&self.db, confirm);
        self.settle_delete(DataChange::Departments, outcome)
    }

    // =========================================================================
    // Staff
    // =========================================================================

    pub fn add_staff(&mut self) -> Result<(), DeskError> {
        let outcome = self.staff.add(&self.db).map(|_| ());
        self.settle(DataChange::Staff, outcome)
    }

    pub fn update_staff(&mut self) -> Result<(), DeskError> {
        let outcome = self.staff.update(&self.db).map(|_| ());
        self.settle(DataChange::Staff, outcome)
    }

    pub fn delete_staff(
        &mut self,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let outcome = self.staff.delete(&self.db, confirm);
        self.settle_delete(DataChange::Staff, outcome)
    }

    // =========================================================================
    // KPIs and categories
    // =========================================================================

    pub fn add_kpi(&mut self) -> Result<(), DeskError> {
        let outcome = self.kpis.add(&self.db).map(|_| ());
        self.settle(DataChange::Kpis, outcome)
    }

    pub fn update_kpi(&mut self) -> Result<(), DeskError> {
        let outcome = self.kpis.update(&self.db).map(|_| ());
        self.settle(DataChange::Kpis, outcome)
    }

    pub fn delete_kpi(
        &mut self,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteOutcome, DeskError> {
        let outcome = self.kpis.delete(&self.db, confirm);
        self.settle_delete(DataChange::Kpis, outcome)
    }

    pub fn add_category(&mut self) -> Result<(), DeskError> {
        let outcome = self.categories.add(&self.db).map(|_| ());
        self.settle(DataChange::Categories, outcome)
    }

    pub fn delete_category(&mut self, name: &str) -> Result<usize, DeskError> {
        let outcome = self.categories.delete(&self.db, name);
        self.settle(DataChange::Categories, outcome)
    }

    // =========================================================================
    // Assignments and results
    // =========================================================================

    pub fn assign_kpi(&mut self) -> Result<(), DeskError> {
        let outcome = self.assignments.assign(&self.db).map(|_| ());
        self.settle(DataChange::Assignments, outcome)
    }

    pub fn unassign_kpi(&mut self, kpi_code: &str, staff_code: &str) -> Result<usize, DeskError> {
        let outcome = self.assignments.unassign(&self.db, kpi_code, staff_code);
        self.settle(DataChange::Assignments, outcome)
    }

    pub fn record_result(&mut self) -> Result<(), DeskError> {
        let outcome = self
            .results
            .record(&self.db, &self.config.recorded_by)
            .map(|_| ());
        self.settle(DataChange::Results, outcome)
    }

    // =========================================================================
    // Backup
    // =========================================================================

    pub fn export_all_data(&self, dir: &Path) -> Result<Vec<PathBuf>, DeskError> {
        db_backup::export_all_data(&self.db, dir)
    }

    pub fn backup_to_json(&self, path: &Path) -> Result<usize, DeskError> {
        db_backup::backup_to_json(&self.db, path)
    }

    /// Replace the store with a JSON backup. The caller confirms beforehand;
    /// every row currently stored is lost.
    pub fn restore_from_json(&mut self, path: &Path) -> Result<usize, DeskError> {
        let outcome = db_backup::restore_from_json(&self.db, path);
        if outcome.is_ok() {
            self.departments.clear_form();
            self.staff.clear_form();
            self.kpis.clear_form();
        }
        self.settle(DataChange::Restored, outcome)
    }

    /// Row counts for every table, for a status line.
    pub fn row_counts(&self) -> Result<Vec<(Table, i64)>, DeskError> {
        let mut counts = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            counts.push((table, self.db.count(table)?));
        }
        Ok(counts)
    }
}

/// Path of the optional configuration file: `~/.kpidesk/config.json`.
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".kpidesk").join("config.json"))
}

/// Load configuration from `~/.kpidesk/config.json`. A missing file yields
/// the defaults.
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(config_path: &Path) -> Result<Config, String> {
    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(config_path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    Ok(config)
}
