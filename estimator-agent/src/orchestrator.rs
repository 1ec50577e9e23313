//! Orchestrator for the estimation pipeline.
//!
//! Stages run strictly in sequence:
//! 1. Analyzer -> structured requirement
//! 2. Retriever -> mandatory + historical epics
//! 3. Generator -> adapted and new epics
//! 4. Aggregator -> totals
//! 5. Validator -> pass/fail, regenerating (step 3) while attempts remain

use crate::agents::{
    EpicGenerator, EstimationValidator, Generation, RequirementAnalyzer, RetrievalSettings,
    TemplateRetriever, aggregate,
};
use crate::mandatory::MandatoryEpicCatalog;
use crate::models::{EstimationResponse, EstimatorConfig};
use estimator_core::{
    AnalyzedRequirement, Epic, EstimatorError, Llm, ProjectEstimation, ProjectRequirement, Result,
    ValidationResult,
};
use estimator_rag::{EmbeddingProvider, KnowledgeBase};
use estimator_telemetry::{estimation_span, metrics, stage_span};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Instrument, info, warn};

/// Phase of the estimation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Initialized,
    Analyzed,
    Retrieved,
    Generated,
    Estimated,
    Validated,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Initialized => write!(f, "Initialized"),
            PipelinePhase::Analyzed => write!(f, "Analyzed"),
            PipelinePhase::Retrieved => write!(f, "Retrieved"),
            PipelinePhase::Generated => write!(f, "Generated"),
            PipelinePhase::Estimated => write!(f, "Estimated"),
            PipelinePhase::Validated => write!(f, "Validated"),
        }
    }
}

/// Per-request state. Each stage fills in its own field.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub requirement: ProjectRequirement,
    /// Populated after analysis
    pub analysis: Option<AnalyzedRequirement>,
    /// Populated after retrieval: mandatory epics first
    pub retrieved: Option<Vec<Epic>>,
    /// Latest generation attempt
    pub generation: Option<Generation>,
    /// Latest aggregated estimation
    pub estimation: Option<ProjectEstimation>,
    /// Latest validation result
    pub validation: Option<ValidationResult>,
    /// Generation re-runs after failed validation
    pub retry_count: u32,
    /// Problems with retries that did not produce a new estimation
    pub notes: Vec<String>,
}

impl PipelineState {
    pub fn new(requirement: ProjectRequirement) -> Self {
        Self {
            phase: PipelinePhase::Initialized,
            requirement,
            analysis: None,
            retrieved: None,
            generation: None,
            estimation: None,
            validation: None,
            retry_count: 0,
            notes: Vec::new(),
        }
    }

    /// Validation findings, then quality concerns, then retry notes.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(validation) = &self.validation {
            warnings.extend(validation.warnings.iter().cloned());
        }
        if let Some(generation) = &self.generation {
            warnings.extend(generation.warnings.iter().cloned());
        }
        warnings.extend(self.notes.iter().cloned());
        warnings
    }

    pub fn passed(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.passed)
    }

    /// Response for a state that reached validation.
    pub fn to_response(&self) -> Result<EstimationResponse> {
        let estimation = self.estimation.as_ref().ok_or_else(|| {
            EstimatorError::Validation(format!("pipeline stopped at phase {}", self.phase))
        })?;
        Ok(EstimationResponse::new(estimation, self.passed(), self.retry_count, self.warnings()))
    }
}

/// Runs requirement text through every stage.
pub struct EstimationPipeline {
    analyzer: RequirementAnalyzer,
    retriever: TemplateRetriever,
    generator: EpicGenerator,
    validator: EstimationValidator,
    max_attempts: u32,
}

impl EstimationPipeline {
    pub fn new(
        analyzer: RequirementAnalyzer,
        retriever: TemplateRetriever,
        generator: EpicGenerator,
        validator: EstimationValidator,
    ) -> Self {
        Self { analyzer, retriever, generator, validator, max_attempts: 2 }
    }

    /// Wire every stage from configuration.
    pub fn from_config(
        config: &EstimatorConfig,
        llm: Arc<dyn Llm>,
        knowledge_base: Arc<dyn KnowledgeBase>,
        embedder: Arc<dyn EmbeddingProvider>,
        mandatory: Arc<MandatoryEpicCatalog>,
    ) -> Self {
        let analyzer = RequirementAnalyzer::new(
            llm.clone(),
            config.json_temperature,
            config.analysis_max_tokens,
        );
        let retriever = TemplateRetriever::new(knowledge_base, embedder, mandatory.clone())
            .with_settings(RetrievalSettings {
                top_k: config.similarity_top_k,
                threshold: config.similarity_threshold,
                fallback_top_k: config.fallback_top_k,
            });
        let generator = EpicGenerator::new(llm, config.temperature, config.generation_max_tokens);
        let validator = EstimationValidator::new(
            mandatory.names().into_iter().map(String::from).collect(),
            config.min_total_hours,
            config.max_total_hours,
        );
        Self::new(analyzer, retriever, generator, validator)
            .with_max_attempts(config.max_generation_attempts)
    }

    /// Generation attempts per request, the first one included.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn estimate(&self, requirement: ProjectRequirement) -> Result<EstimationResponse> {
        self.run(requirement).await?.to_response()
    }

    /// Run every stage and return the final state.
    pub async fn run(&self, requirement: ProjectRequirement) -> Result<PipelineState> {
        let span = estimation_span(&requirement.project_name);
        let result = self.run_stages(PipelineState::new(requirement)).instrument(span).await;
        let outcome = match &result {
            Ok(state) if state.passed() => "passed",
            Ok(_) => "failed_validation",
            Err(e) if e.is_upstream_generation() => "upstream_error",
            Err(_) => "error",
        };
        metrics().record_run(outcome);
        result
    }

    async fn run_stages(&self, mut state: PipelineState) -> Result<PipelineState> {
        info!(project = %state.requirement.project_name, "Starting estimation");

        let analysis = self
            .analyzer
            .analyze(&state.requirement)
            .instrument(stage_span("analyzer", 1))
            .await?;
        state.analysis = Some(analysis.clone());
        state.phase = PipelinePhase::Analyzed;

        let retrieved =
            self.retriever.retrieve(&analysis).instrument(stage_span("retriever", 1)).await;
        state.retrieved = Some(retrieved.clone());
        state.phase = PipelinePhase::Retrieved;

        let mut attempt = 1u32;
        loop {
            let generation = match self
                .generator
                .generate(&analysis, &retrieved)
                .instrument(stage_span("generator", attempt))
                .await
            {
                Ok(generation) => generation,
                Err(e) if attempt > 1 && e.is_upstream_generation() => {
                    warn!(
                        attempt = attempt,
                        error = %e,
                        "Regeneration failed; keeping previous estimation"
                    );
                    state.notes.push(format!("Regeneration attempt {} failed: {}", attempt, e));
                    break;
                }
                Err(e) => return Err(e),
            };
            state.phase = PipelinePhase::Generated;

            let estimation =
                aggregate(&state.requirement.project_name, &analysis, generation.epics.clone());
            state.generation = Some(generation);
            state.phase = PipelinePhase::Estimated;

            let validation = self.validator.validate(&estimation);
            let passed = validation.passed;
            state.estimation = Some(estimation);
            state.validation = Some(validation);
            state.phase = PipelinePhase::Validated;

            if passed || attempt >= self.max_attempts {
                if !passed {
                    warn!(
                        attempts = attempt,
                        "Validation still failing; returning best-effort estimation"
                    );
                }
                break;
            }

            attempt += 1;
            state.retry_count += 1;
            metrics().record_retry();
            warn!(
                attempt = attempt,
                max_attempts = self.max_attempts,
                "Validation failed; regenerating epics"
            );
        }

        info!(
            passed = state.passed(),
            retries = state.retry_count,
            total_hours = state.estimation.as_ref().map(|e| e.total_hours()).unwrap_or(0),
            "Estimation finished"
        );
        Ok(state)
    }
}
