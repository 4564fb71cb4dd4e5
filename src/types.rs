use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration loaded from `~/.kpidesk/config.json`.
///
/// Every field is optional; a missing file means all defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Overrides the default database location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Stored as `recorded_by` on every KPI result.
    #[serde(default = "default_recorded_by")]
    pub recorded_by: String,
    /// Install demonstration rows when the store has no departments.
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
}

fn default_recorded_by() -> String {
    "System".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            recorded_by: default_recorded_by(),
            seed_sample_data: true,
            numeric_policy: NumericPolicy::default(),
        }
    }
}

/// What the entity forms do with numeric fields that don't parse.
///
/// Blank input always means zero. `DefaultToZero` also turns unparsable
/// input into zero; `Reject` refuses the submission instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumericPolicy {
    #[default]
    DefaultToZero,
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.recorded_by, "System");
        assert!(config.seed_sample_data);
    }

    #[test]
    fn test_config_reads_camel_case() {
        let config: Config = serde_json::from_str(
            r#"{"dbPath": "/tmp/desk.db", "recordedBy": "Lan", "seedSampleData": false, "numericPolicy": "reject"}"#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/desk.db")));
        assert_eq!(config.recorded_by, "Lan");
        assert!(!config.seed_sample_data);
        assert_eq!(config.numeric_policy, NumericPolicy::Reject);
    }
}
