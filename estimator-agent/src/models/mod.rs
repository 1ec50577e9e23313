//! Configuration and response models.

pub mod config;
pub mod response;

pub use config::{EstimatorConfig, MAX_ATTEMPTS_LIMIT, MAX_TOKENS_LIMIT, ValidationError};
pub use response::{EpicResponse, EstimationResponse, TaskResponse};
