//! # estimator-agent
//!
//! Turns a free-text project description into an epic/task effort
//! estimation. Five stages run in sequence:
//!
//! 1. **Analyzer** - extracts domain, features, user types, target platforms
//!    and epic categories from the requirement
//! 2. **Retriever** - loads the mandatory epics and looks up similar epics in
//!    the historical knowledge base
//! 3. **Generator** - adapts retrieved epics to the target platforms and adds
//!    new epics for uncovered features
//! 4. **Aggregator** - sums hours per platform and overall
//! 5. **Validator** - checks the result and asks for one regeneration when a
//!    blocking check fails
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use estimator_agent::{EstimationPipeline, EstimatorConfig, MandatoryEpicCatalog};
//! use estimator_core::ProjectRequirement;
//!
//! let config = EstimatorConfig::from_env()?;
//! let mandatory = Arc::new(MandatoryEpicCatalog::load(config.mandatory_epics_path.as_deref())?);
//! let pipeline =
//!     EstimationPipeline::from_config(&config, llm, knowledge_base, embedder, mandatory);
//!
//! let response = pipeline
//!     .estimate(ProjectRequirement::new("Wedding Planner", "Mobile app with an admin panel"))
//!     .await?;
//! println!("{} hours", response.total_hours);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ProjectRequirement → Analyzer → AnalyzedRequirement
//!                         ↓
//!                    Retriever → mandatory + historical epics
//!                         ↓
//!                    Generator → adapted + new epics  ←─┐
//!                         ↓                             │ failed validation
//!                    Aggregator → ProjectEstimation     │ (attempts remain)
//!                         ↓                             │
//!                    Validator ─────────────────────────┘
//!                         ↓
//!                 EstimationResponse
//! ```

pub mod agents;
pub mod mandatory;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod output;

pub use agents::{
    EpicGenerator, EstimationValidator, Generation, PlatformSignals, RequirementAnalyzer,
    RetrievalSettings, RuleBasedEstimator, TemplateRetriever, aggregate, correct_platforms,
    quality_warnings,
};
pub use estimator_core::{EstimatorError, Result};
pub use mandatory::MandatoryEpicCatalog;
pub use merge::{NameIndex, dedup_by_name, merge_unique};
pub use models::{EpicResponse, EstimationResponse, EstimatorConfig, TaskResponse, ValidationError};
pub use orchestrator::{EstimationPipeline, PipelinePhase, PipelineState};
pub use output::EstimatorOutput;
