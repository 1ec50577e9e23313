//! Pipeline stages.

pub mod aggregator;
pub mod analyzer;
pub mod generator;
pub mod prompts;
pub mod retriever;
pub mod rules;
pub mod validator;

pub use aggregator::aggregate;
pub use analyzer::{PlatformSignals, RequirementAnalyzer, correct_platforms};
pub use generator::{EpicGenerator, Generation, quality_warnings};
pub use retriever::{RetrievalSettings, TemplateRetriever};
pub use rules::RuleBasedEstimator;
pub use validator::EstimationValidator;
