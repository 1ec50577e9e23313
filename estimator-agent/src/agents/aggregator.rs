//! Rolls the final epic list up into a [`ProjectEstimation`].

use estimator_core::{AnalyzedRequirement, Epic, ProjectEstimation};
use tracing::info;

/// Build the estimation for `epics`. Totals are derived here and nowhere else.
pub fn aggregate(
    project_name: &str,
    analysis: &AnalyzedRequirement,
    epics: Vec<Epic>,
) -> ProjectEstimation {
    let estimation = ProjectEstimation::from_epics(
        project_name,
        analysis.platforms.clone(),
        analysis.complexity,
        epics,
    );
    info!(
        total_hours = estimation.total_hours(),
        epics = estimation.epic_count(),
        tasks = estimation.task_count(),
        mandatory = estimation.mandatory_epics_count(),
        custom = estimation.custom_epics_count(),
        by_platform = ?estimation.hours_by_platform(),
        "Estimation aggregated"
    );
    estimation
}
