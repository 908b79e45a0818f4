//! Engine configuration.
//!
//! Loaded from an optional JSON file; every field has a default so a
//! missing file or a partial document is fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::schema::status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executed-activity statuses counted as final (case-insensitive).
    pub final_statuses: Vec<String>,
    /// Scheduled-activity validation values counted as validated (case-insensitive).
    pub validated_values: Vec<String>,
    pub plan_file: String,
    pub lines_file: String,
    pub executed_file: String,
    pub scheduled_file: String,
    pub selection_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            final_statuses: vec![status::FINAL.to_string()],
            validated_values: vec![status::VALIDATED.to_string()],
            plan_file: "plan.csv".to_string(),
            lines_file: "lines.csv".to_string(),
            executed_file: "executed.csv".to_string(),
            scheduled_file: "scheduled.csv".to_string(),
            selection_file: "path_selection.csv".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ForecastError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No engine config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn is_final(&self, raw_status: &str) -> bool {
        matches_any(&self.final_statuses, raw_status)
    }

    pub fn is_validated(&self, raw_validation: &str) -> bool {
        matches_any(&self.validated_values, raw_validation)
    }
}

fn matches_any(accepted: &[String], raw: &str) -> bool {
    let raw = raw.trim();
    accepted.iter().any(|a| a.trim().eq_ignore_ascii_case(raw))
}
