// Form helpers shared by every entity manager: required-field checks,
// numeric parsing under the configured policy, and delete confirmation types.

use serde::Serialize;

use crate::db::CascadeSummary;
use crate::error::DeskError;
use crate::types::NumericPolicy;

/// Trimmed value of a required field, or `MissingField`.
pub fn require(field: &'static str, value: &str) -> Result<String, DeskError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DeskError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Parse a decimal form field. Blank is zero; non-finite or unparsable input
/// is zero or an error depending on `policy`.
pub fn parse_decimal(policy: NumericPolicy, field: &'static str, raw: &str) -> Result<f64, DeskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => match policy {
            NumericPolicy::DefaultToZero => {
                log::debug!("{field}: {trimmed:?} is not a number, using 0");
                Ok(0.0)
            }
            NumericPolicy::Reject => Err(DeskError::NotANumber {
                field,
                value: trimmed.to_string(),
            }),
        },
    }
}

/// Parse a non-negative whole-number form field under `policy`.
pub fn parse_count(policy: NumericPolicy, field: &'static str, raw: &str) -> Result<i64, DeskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    match trimmed.parse::<u32>() {
        Ok(v) => Ok(i64::from(v)),
        Err(_) => match policy {
            NumericPolicy::DefaultToZero => {
                log::debug!("{field}: {trimmed:?} is not a count, using 0");
                Ok(0)
            }
            NumericPolicy::Reject => Err(DeskError::NotANumber {
                field,
                value: trimmed.to_string(),
            }),
        },
    }
}

/// Render a stored number back into a form field; zero shows as blank.
pub fn number_field(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else {
        value.to_string()
    }
}

/// Extract the code from a pick-list display value (`"CODE - Name"`).
/// A bare code is returned unchanged.
pub fn code_from_display(display: &str) -> &str {
    display
        .split_once(" - ")
        .map(|(code, _)| code)
        .unwrap_or(display)
        .trim()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// What the user is asked before a delete that takes dependents with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePrompt {
    pub entity: &'static str,
    pub code: String,
    pub dependents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum DeleteOutcome {
    Deleted(CascadeSummary),
    Cancelled,
}
