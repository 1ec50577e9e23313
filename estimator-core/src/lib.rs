//! # estimator-core
//!
//! Core types and traits shared by every estimator crate.
//!
//! - [`Platform`], [`Task`], [`Epic`] - the unit-of-work model
//! - [`ProjectRequirement`] / [`AnalyzedRequirement`] - pipeline inputs
//! - [`ProjectEstimation`] - the aggregated result with derived totals
//! - [`Llm`] - the seam every model-backed stage talks through
//! - [`EstimatorError`] / [`Result`] - unified error handling

pub mod error;
pub mod model;
pub mod types;

pub use error::{EstimatorError, Result};
pub use model::{FinishReason, GenerateConfig, Llm, LlmRequest, LlmResponse, UsageMetadata};
pub use types::{
    AI_GENERATED_SOURCE, AnalyzedRequirement, Complexity, Efforts, Epic, EstimationMethod,
    MANDATORY_SOURCE, Platform, ProjectEstimation, ProjectRequirement, Task, ValidationResult,
    name_key,
};
