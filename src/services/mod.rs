// Business logic on top of the record store: one manager per editable entity
// (form state, selection, list view) plus the assignment and result operations.

pub mod assignments;
pub mod categories;
pub mod departments;
pub mod form;
pub mod kpis;
pub mod results;
pub mod staff;

pub use assignments::AssignmentDesk;
pub use categories::CategoryDesk;
pub use departments::DepartmentManager;
pub use form::{DeleteOutcome, DeletePrompt};
pub use kpis::KpiManager;
pub use results::ResultDesk;
pub use staff::StaffManager;
