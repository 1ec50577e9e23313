//! # estimator-eval
//!
//! Offline comparison of an actual (historical) estimation against a
//! predicted one. Five dimensions are measured: total hours, platform
//! coverage, user-role coverage, epic coverage with fuzzy name matching,
//! and task coverage/granularity per matched epic.
//!
//! ```rust,ignore
//! use estimator_eval::{Comparison, EstimationDocument, render_markdown};
//!
//! let actual = EstimationDocument::load("actual.json".as_ref())?;
//! let predicted = EstimationDocument::load("predicted.json".as_ref())?;
//! let comparison = Comparison::run(&actual, &predicted, 0.75);
//! println!("{}", render_markdown(&comparison, chrono::Local::now()));
//! ```

pub mod compare;
pub mod document;
pub mod error;
pub mod report;
pub mod scoring;

pub use compare::{
    Comparison, CoverageStatus, DEFAULT_THRESHOLD, EpicCoverage, EpicMatch, EpicTaskDetail,
    Granularity, HoursComparison, HoursStatus, MatchType, SetCoverage, TaskCoverage,
    UserTypeBreakdown, UserTypeCoverage, compare_by_user_type, compare_hours, compare_sets,
    compare_tasks, extract_user_type, match_epics,
};
pub use document::{EpicSummary, EstimationDocument};
pub use error::{EvalError, Result};
pub use report::{render_markdown, save_markdown};
pub use scoring::{fuzzy_ratio, names_equal};

/// Reject thresholds outside `[0, 1]`.
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(EvalError::InvalidThreshold(threshold))
    }
}
