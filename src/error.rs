//! Error types for desk operations
//!
//! Errors are classified by who can fix them:
//! - Validation: bad or missing form input, caught before touching the store
//! - Conflict: the store already holds the code/name/pair being added
//! - Reference: a picked department, category, KPI or staff member no longer exists
//! - Failure: store, file or document errors, surfaced with their raw message

use thiserror::Error;

use crate::db::DbError;

/// Error types for desk operations
#[derive(Debug, Error)]
pub enum DeskError {
    // Validation errors
    #[error("Please enter {0}")]
    MissingField(&'static str),

    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("Please select a {0} first")]
    NoSelection(&'static str),

    #[error("{value:?} is not a valid {field}")]
    InvalidChoice { field: &'static str, value: String },

    // Conflicts
    #[error("{entity} code already exists")]
    DuplicateCode { entity: &'static str },

    #[error("This KPI is already assigned to this staff member")]
    DuplicateAssignment,

    // Reference errors
    #[error("{entity} not found: {key}")]
    ReferenceNotFound { entity: &'static str, key: String },

    #[error("{entity} {code} no longer exists")]
    NotFound { entity: &'static str, code: String },

    // Failures
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid backup document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Backup failed: {0}")]
    Backup(String),
}

impl DeskError {
    /// Turn a store error from an add/update into `DuplicateCode` when it is a
    /// uniqueness violation.
    pub fn from_write(entity: &'static str, err: DbError) -> Self {
        if err.is_unique_violation() {
            DeskError::DuplicateCode { entity }
        } else {
            DeskError::Db(err)
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            DeskError::MissingField(_)
            | DeskError::NotANumber { .. }
            | DeskError::NoSelection(_)
            | DeskError::InvalidChoice { .. } => ErrorType::Validation,
            DeskError::DuplicateCode { .. } | DeskError::DuplicateAssignment => ErrorType::Conflict,
            DeskError::ReferenceNotFound { .. } | DeskError::NotFound { .. } => {
                ErrorType::Reference
            }
            DeskError::Db(_)
            | DeskError::Io(_)
            | DeskError::Json(_)
            | DeskError::Csv(_)
            | DeskError::Backup(_) => ErrorType::Failure,
        }
    }

    /// True if the form should be left as is so the user can correct it.
    pub fn keeps_form(&self) -> bool {
        matches!(
            self.error_type(),
            ErrorType::Validation | ErrorType::Conflict | ErrorType::Reference
        )
    }

    /// The text a UI shows for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Serializable error representation for a UI layer
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskErrorInfo {
    pub message: String,
    pub error_type: ErrorType,
    pub keeps_form: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Validation,
    Conflict,
    Reference,
    Failure,
}

impl From<&DeskError> for DeskErrorInfo {
    fn from(err: &DeskError) -> Self {
        DeskErrorInfo {
            message: err.user_message(),
            error_type: err.error_type(),
            keeps_form: err.keeps_form(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_becomes_duplicate_code() {
        let err = DeskError::from_write(
            "Department",
            DbError::UniqueViolation {
                table: "departments",
                detail: "UNIQUE constraint failed: departments.dept_code".to_string(),
            },
        );
        assert!(matches!(err, DeskError::DuplicateCode { entity: "Department" }));
        assert_eq!(err.user_message(), "Department code already exists");
        assert!(err.keeps_form());
    }

    #[test]
    fn test_other_store_errors_pass_through_verbatim() {
        let err = DeskError::from_write("Staff", DbError::Schema("disk full".to_string()));
        assert_eq!(err.error_type(), ErrorType::Failure);
        assert!(err.user_message().contains("disk full"));
    }

    #[test]
    fn test_error_info_serializes_camel_case() {
        let info = DeskErrorInfo::from(&DeskError::MissingField("dept_code"));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["errorType"], "validation");
        assert_eq!(json["keepsForm"], true);
        assert_eq!(json["message"], "Please enter dept_code");
    }

    #[test]
    fn test_failed_command_reports_failure_type() {
        let parse = serde_json::from_str::<serde_json::Value>("{ broken").unwrap_err();
        let info = DeskErrorInfo::from(&DeskError::from(parse));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["errorType"], "failure");
        assert_eq!(json["keepsForm"], false);
    }
}
