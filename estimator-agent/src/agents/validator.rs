//! Threshold checks on a finished estimation.

use estimator_core::{ProjectEstimation, ValidationResult};
use tracing::{info, warn};

pub const STAGE: &str = "validator";

/// Checks a [`ProjectEstimation`] and decides whether it is good enough to
/// return without regenerating.
///
/// Blocking checks fail the result: no epics, no target platforms, a total
/// below the configured minimum, or an epic whose tasks carry no platform
/// hours. Missing mandatory epics, epics without tasks and a total above the
/// configured maximum are reported as warnings only.
#[derive(Debug, Clone)]
pub struct EstimationValidator {
    mandatory_names: Vec<String>,
    min_total_hours: u32,
    max_total_hours: u32,
}

impl EstimationValidator {
    pub fn new(mandatory_names: Vec<String>, min_total_hours: u32, max_total_hours: u32) -> Self {
        Self { mandatory_names, min_total_hours, max_total_hours }
    }

    pub fn validate(&self, estimation: &ProjectEstimation) -> ValidationResult {
        let mut blocking = Vec::new();
        let mut warnings = Vec::new();

        let missing: Vec<&str> = self
            .mandatory_names
            .iter()
            .filter(|name| !estimation.epics().iter().any(|e| &e.name == *name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            warnings.push(format!("Missing mandatory epics: {}", missing.join(", ")));
        }

        let empty: Vec<&str> = estimation
            .epics()
            .iter()
            .filter(|e| e.tasks.is_empty())
            .map(|e| e.name.as_str())
            .collect();
        if !empty.is_empty() {
            warnings.push(format!("Epics with no tasks: {}", empty.join(", ")));
        }

        if estimation.epics().is_empty() {
            blocking.push("No epics in estimation".to_string());
        }
        if estimation.target_platforms().is_empty() {
            blocking.push("No target platforms specified".to_string());
        }

        let total = estimation.total_hours();
        if total < self.min_total_hours {
            blocking.push(format!(
                "Total effort too low: {} hours (minimum {})",
                total, self.min_total_hours
            ));
        } else if total > self.max_total_hours {
            warnings.push(format!(
                "Total effort too high: {} hours (maximum {})",
                total, self.max_total_hours
            ));
        }

        let unassigned: Vec<&str> = estimation
            .epics()
            .iter()
            .filter(|e| !e.tasks.is_empty() && e.platforms().is_empty())
            .map(|e| e.name.as_str())
            .collect();
        if !unassigned.is_empty() {
            blocking.push(format!("Epics with no platform assigned: {}", unassigned.join(", ")));
        }

        let passed = blocking.is_empty();
        if passed {
            info!(warnings = warnings.len(), total_hours = total, "Validation passed");
        } else {
            warn!(errors = ?blocking, "Validation failed");
        }

        blocking.extend(warnings);
        ValidationResult { passed, warnings: blocking }
    }
}
