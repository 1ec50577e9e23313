//! Wire shape of a finished estimate.

use estimator_core::{
    Complexity, Efforts, Epic, EstimationMethod, Platform, ProjectEstimation, Task,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub description: String,
    pub efforts: Efforts,
    pub estimation_method: EstimationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicResponse {
    pub name: String,
    pub description: String,
    pub is_mandatory: bool,
    pub source_template: String,
    pub total_hours: u32,
    pub tasks: Vec<TaskResponse>,
}

/// The estimate as returned to callers: totals, epics and run diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResponse {
    pub project_name: String,
    pub total_hours: u32,
    pub total_hours_by_platform: BTreeMap<Platform, u32>,
    pub target_platforms: BTreeSet<Platform>,
    pub complexity: Complexity,
    pub epics: Vec<EpicResponse>,
    pub mandatory_epics_count: usize,
    pub custom_epics_count: usize,
    pub validation_passed: bool,
    pub retry_count: u32,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            description: task.description.clone(),
            efforts: task.efforts.clone(),
            estimation_method: task.source,
            reasoning: task.reasoning.clone(),
        }
    }
}

impl From<&Epic> for EpicResponse {
    fn from(epic: &Epic) -> Self {
        Self {
            name: epic.name.clone(),
            description: epic.description.clone(),
            is_mandatory: epic.is_mandatory,
            source_template: epic.source_template.clone(),
            total_hours: epic.total_hours(),
            tasks: epic.tasks.iter().map(TaskResponse::from).collect(),
        }
    }
}

impl EstimationResponse {
    pub fn new(
        estimation: &ProjectEstimation,
        validation_passed: bool,
        retry_count: u32,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            project_name: estimation.project_name().to_string(),
            total_hours: estimation.total_hours(),
            total_hours_by_platform: estimation.hours_by_platform().clone(),
            target_platforms: estimation.target_platforms().clone(),
            complexity: estimation.complexity(),
            epics: estimation.epics().iter().map(EpicResponse::from).collect(),
            mandatory_epics_count: estimation.mandatory_epics_count(),
            custom_epics_count: estimation.custom_epics_count(),
            validation_passed,
            retry_count,
            warnings,
        }
    }
}
