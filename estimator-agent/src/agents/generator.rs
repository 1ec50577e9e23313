//! Epic adaptation and generation.
//!
//! One model call adapts the retrieved epics to the target platforms and
//! proposes new epics. The answer is then checked against what was sent:
//! mandatory epics are never taken from the model, adapted epics keep their
//! name, description and every original task, and new epics are merged by
//! exact name.

use super::prompts::{generation_instruction, generation_prompt};
use super::rules::RuleBasedEstimator;
use crate::merge::merge_unique;
use estimator_core::{
    AI_GENERATED_SOURCE, AnalyzedRequirement, Efforts, Epic, EstimationMethod, Llm, LlmRequest,
    Platform, Result, Task, name_key,
};
use estimator_model::generate_json;
use estimator_telemetry::metrics;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const STAGE: &str = "generator";

/// Range of new epics requested from the model.
pub const DEFAULT_NEW_EPICS: (usize, usize) = (15, 25);

/// Fewer generated epics than this raises a quality warning.
pub const MIN_GENERATED_EPICS: usize = 15;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerationResponse {
    modified_epics: Vec<RawEpic>,
    custom_epics: Vec<RawEpic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEpic {
    name: String,
    description: String,
    tasks: Vec<RawTask>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTask {
    description: String,
    efforts: HashMap<String, Value>,
    reasoning: Option<String>,
}

impl RawTask {
    /// Numeric hour entries; numbers sent as strings are accepted.
    fn hour_entries(&self) -> Vec<(&str, f64)> {
        self.efforts
            .iter()
            .filter_map(|(label, value)| {
                let hours = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().trim_end_matches('h').trim().parse().ok(),
                    _ => None,
                }?;
                Some((label.as_str(), hours))
            })
            .collect()
    }
}

/// Merged epic list and the quality concerns raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub epics: Vec<Epic>,
    pub warnings: Vec<String>,
}

pub struct EpicGenerator {
    llm: Arc<dyn Llm>,
    temperature: f32,
    max_tokens: u32,
    new_epics: (usize, usize),
}

impl EpicGenerator {
    pub fn new(llm: Arc<dyn Llm>, temperature: f32, max_tokens: u32) -> Self {
        Self { llm, temperature, max_tokens, new_epics: DEFAULT_NEW_EPICS }
    }

    /// Ask for between `min` and `max` new epics. A narrower range keeps the
    /// response inside the output budget.
    pub fn with_new_epic_target(mut self, min: usize, max: usize) -> Self {
        self.new_epics = (min.min(max), max.max(min));
        self
    }

    /// Build the complete epic list from the retriever's output.
    ///
    /// Truncated or unparseable model output is an upstream-generation error.
    #[instrument(skip_all, fields(stage = STAGE, epics_in = epics.len()))]
    pub async fn generate(
        &self,
        analysis: &AnalyzedRequirement,
        epics: &[Epic],
    ) -> Result<Generation> {
        let (mandatory, retrieved): (Vec<Epic>, Vec<Epic>) =
            epics.iter().cloned().partition(|e| e.is_mandatory);
        let mandatory_names: Vec<&str> = mandatory.iter().map(|e| e.name.as_str()).collect();
        info!(mandatory = mandatory.len(), retrieved = retrieved.len(), "Generating epics");

        let prompt = generation_prompt(analysis, &mandatory_names, &retrieved, self.new_epics);
        let request = LlmRequest::new(prompt)
            .with_system(generation_instruction(analysis))
            .json(self.temperature, self.max_tokens);

        metrics().record_model_call(STAGE);
        let response: GenerationResponse = generate_json(self.llm.as_ref(), STAGE, request).await?;
        debug!(
            modified = response.modified_epics.len(),
            custom = response.custom_epics.len(),
            "Model proposal received"
        );

        let generation = assemble(analysis, mandatory, retrieved, response);
        info!(
            epics = generation.epics.len(),
            warnings = generation.warnings.len(),
            "Epic generation complete"
        );
        Ok(generation)
    }
}

fn assemble(
    analysis: &AnalyzedRequirement,
    mandatory: Vec<Epic>,
    retrieved: Vec<Epic>,
    response: GenerationResponse,
) -> Generation {
    let estimator = RuleBasedEstimator::new(analysis.platforms.clone(), analysis.complexity);
    let retrieved_keys: HashSet<String> = retrieved.iter().map(Epic::name_key).collect();

    let mut adaptations: HashMap<String, RawEpic> = HashMap::new();
    let mut candidates: Vec<RawEpic> = Vec::new();
    for raw in response.modified_epics {
        let key = name_key(&raw.name);
        if retrieved_keys.contains(&key) {
            adaptations.entry(key).or_insert(raw);
        } else {
            warn!(
                epic = %raw.name,
                "Adapted epic matches no retrieved epic; treating it as a new epic"
            );
            candidates.push(raw);
        }
    }
    candidates.extend(response.custom_epics);

    let mut epics = mandatory;
    let mut adapted = Vec::with_capacity(retrieved.len());
    for original in &retrieved {
        let proposal = adaptations.remove(&original.name_key());
        if proposal.is_none() {
            debug!(epic = %original.name, "No adaptation returned; re-targeting original tasks");
        }
        adapted.push(adapt_epic(&estimator, original, proposal));
    }
    let skipped = merge_unique(&mut epics, adapted);
    if !skipped.is_empty() {
        debug!(skipped = ?skipped, "Retrieved epics already present");
    }

    let new_epics: Vec<Epic> =
        candidates.into_iter().filter_map(|raw| new_epic(&estimator, raw)).collect();
    let skipped = merge_unique(&mut epics, new_epics);
    if !skipped.is_empty() {
        info!(skipped = ?skipped, "Dropped generated epics with names already in use");
    }

    let warnings = quality_warnings(&epics, analysis);
    for warning in &warnings {
        warn!(warning = %warning, "Estimation quality");
    }
    Generation { epics, warnings }
}

/// Apply a model proposal to a retrieved epic. Name, description and every
/// original task description are kept; the model may only change hours and
/// append tasks.
fn adapt_epic(estimator: &RuleBasedEstimator, original: &Epic, proposal: Option<RawEpic>) -> Epic {
    let mut epic = Epic::new(original.name.clone(), original.description.clone())
        .with_source(original.source_template.clone());

    let proposed_tasks = proposal.map(|p| p.tasks).unwrap_or_default();
    let mut by_description: HashMap<&str, &RawTask> = HashMap::new();
    for task in &proposed_tasks {
        by_description.entry(task.description.as_str()).or_insert(task);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for task in &original.tasks {
        seen.insert(task.description.as_str());
        let proposed = by_description.get(task.description.as_str());
        let efforts = proposed.map(|p| estimator.sanitize(p.hour_entries())).unwrap_or_default();

        let adapted = if efforts.is_empty() {
            let (efforts, method) = estimator.retarget(&task.efforts);
            Task::new(task.description.clone(), efforts, method)
        } else {
            Task::new(task.description.clone(), efforts, EstimationMethod::PatternMatch)
        };
        epic.tasks.push(with_reasoning(adapted, proposed.and_then(|p| p.reasoning.clone())));
    }

    for task in &proposed_tasks {
        let description = task.description.trim();
        if description.is_empty() || !seen.insert(task.description.as_str()) {
            continue;
        }
        epic.tasks.push(generated_task(estimator, task));
    }

    epic
}

fn new_epic(estimator: &RuleBasedEstimator, raw: RawEpic) -> Option<Epic> {
    let name = raw.name.trim();
    if name.is_empty() {
        warn!("Dropping generated epic without a name");
        return None;
    }
    let mut epic = Epic::new(name, raw.description.trim()).with_source(AI_GENERATED_SOURCE);
    for task in raw.tasks.iter().filter(|t| !t.description.trim().is_empty()) {
        epic.tasks.push(generated_task(estimator, task));
    }
    Some(epic)
}

fn generated_task(estimator: &RuleBasedEstimator, raw: &RawTask) -> Task {
    let efforts = estimator.sanitize(raw.hour_entries());
    let task = if efforts.is_empty() {
        let estimated = estimator.estimate_all(&Efforts::new());
        Task::new(raw.description.trim(), estimated, EstimationMethod::RuleBased)
    } else {
        Task::new(raw.description.trim(), efforts, EstimationMethod::Ai)
    };
    with_reasoning(task, raw.reasoning.clone())
}

fn with_reasoning(task: Task, reasoning: Option<String>) -> Task {
    match reasoning.filter(|r| !r.trim().is_empty()) {
        Some(reasoning) => task.with_reasoning(reasoning),
        None => task,
    }
}

/// Coverage concerns with a finished epic list. None of them is fatal.
pub fn quality_warnings(epics: &[Epic], analysis: &AnalyzedRequirement) -> Vec<String> {
    let mut warnings = Vec::new();
    let total = epics.len();
    let features = analysis.features.len();

    let expected_min = MIN_GENERATED_EPICS.max(features / 2);
    if total < expected_min {
        warnings.push(format!(
            "Low epic count: {} epics for {} features, expected at least {}",
            total, features, expected_min
        ));
    }

    let generated = epics.iter().filter(|e| e.source_template == AI_GENERATED_SOURCE).count();
    if generated < MIN_GENERATED_EPICS {
        warnings.push(format!(
            "Low custom epic generation: only {} new epics, {}-25 expected",
            generated, MIN_GENERATED_EPICS
        ));
    }

    let used: BTreeSet<Platform> = epics.iter().flat_map(|e| e.platforms()).collect();
    let missing: Vec<&str> =
        analysis.platforms.iter().filter(|p| !used.contains(*p)).map(Platform::as_str).collect();
    if !missing.is_empty() {
        warnings.push(format!("Missing platform coverage: {} have no tasks", missing.join(", ")));
    }

    let small = epics.iter().filter(|e| e.tasks.len() < 2).count();
    if total > 0 && small as f64 > total as f64 * 0.3 {
        warnings.push(format!(
            "Many small epics: {} of {} epics have fewer than 2 tasks",
            small, total
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimator_core::Complexity;
    use serde_json::json;

    fn efforts(pairs: &[(Platform, u32)]) -> Efforts {
        pairs.iter().copied().collect()
    }

    fn historical(description: &str, pairs: &[(Platform, u32)]) -> Task {
        Task::new(description, efforts(pairs), EstimationMethod::Historical)
    }

    fn analysis() -> AnalyzedRequirement {
        AnalyzedRequirement {
            domain: "food".into(),
            platforms: [Platform::Flutter, Platform::Api].into_iter().collect(),
            complexity: Complexity::Medium,
            ..Default::default()
        }
    }

    fn retrieved() -> Epic {
        Epic::new("Order Tracking", "From Template: Food")
            .with_source("Template: Food")
            .with_task(historical("Live map", &[(Platform::Flutter, 12), (Platform::Api, 6)]))
            .with_task(historical("Order status", &[(Platform::Flutter, 6)]))
    }

    fn response(value: serde_json::Value) -> GenerationResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_adaptation_keeps_names_and_tasks() {
        let generation = assemble(
            &analysis(),
            Vec::new(),
            vec![retrieved()],
            response(json!({
                "modified_epics": [{
                    "name": "order tracking",
                    "description": "Rewritten description",
                    "tasks": [
                        {"description": "Live map", "efforts": {"Flutter": 16, "Web App": 10}},
                        {"description": "Live map with ETA", "efforts": {"API": "4h"}},
                        {"description": "Courier chat", "efforts": {"Flutter": 99}}
                    ]
                }]
            })),
        );

        let epic = &generation.epics[0];
        assert_eq!(epic.name, "Order Tracking");
        assert_eq!(epic.description, "From Template: Food");
        assert_eq!(epic.source_template, "Template: Food");

        let descriptions: Vec<_> = epic.tasks.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Live map", "Order status", "Live map with ETA", "Courier chat"]
        );

        assert_eq!(epic.tasks[0].efforts, efforts(&[(Platform::Flutter, 16)]));
        assert_eq!(epic.tasks[0].source, EstimationMethod::PatternMatch);
        assert_eq!(epic.tasks[1].efforts, efforts(&[(Platform::Flutter, 6)]));
        assert_eq!(epic.tasks[1].source, EstimationMethod::Historical);
        assert_eq!(epic.tasks[2].efforts, efforts(&[(Platform::Api, 4)]));
        assert_eq!(epic.tasks[2].source, EstimationMethod::Ai);
        assert_eq!(epic.tasks[3].efforts, efforts(&[(Platform::Flutter, 32)]));
    }

    #[test]
    fn test_renamed_epic_becomes_new_epic() {
        let generation = assemble(
            &analysis(),
            Vec::new(),
            vec![retrieved()],
            response(json!({
                "modified_epics": [{
                    "name": "Delivery Tracking",
                    "tasks": [{"description": "Live map", "efforts": {"Flutter": 10}}]
                }]
            })),
        );

        let names: Vec<_> = generation.epics.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Order Tracking", "Delivery Tracking"]);
        assert_eq!(generation.epics[0].tasks.len(), 2);
        assert_eq!(generation.epics[1].source_template, AI_GENERATED_SOURCE);
    }

    #[test]
    fn test_missing_adaptation_keeps_retrieved_epic() {
        let generation =
            assemble(&analysis(), Vec::new(), vec![retrieved()], GenerationResponse::default());
        assert_eq!(generation.epics.len(), 1);
        assert_eq!(
            generation.epics[0].tasks[0].efforts,
            efforts(&[(Platform::Flutter, 12), (Platform::Api, 6)])
        );
    }

    #[test]
    fn test_new_epics_do_not_shadow_existing_names() {
        let mandatory = Epic::new("Authentication", "fixed")
            .mandatory()
            .with_task(historical("Login", &[(Platform::Cms, 4)]));
        let generation = assemble(
            &analysis(),
            vec![mandatory.clone()],
            vec![retrieved()],
            response(json!({
                "custom_epics": [
                    {"name": "AUTHENTICATION", "tasks": [
                        {"description": "Login", "efforts": {"Flutter": 2}}
                    ]},
                    {"name": "Order Tracking ", "tasks": []},
                    {"name": "Payments", "tasks": [{"description": "Checkout", "efforts": {}}]},
                    {"name": "payments", "tasks": []},
                    {"name": "  ", "tasks": []}
                ]
            })),
        );

        let names: Vec<_> = generation.epics.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Authentication", "Order Tracking", "Payments"]);
        assert_eq!(generation.epics[0], mandatory);

        let checkout = &generation.epics[2].tasks[0];
        assert_eq!(checkout.source, EstimationMethod::RuleBased);
        assert_eq!(checkout.efforts, efforts(&[(Platform::Flutter, 8), (Platform::Api, 12)]));
    }

    #[test]
    fn test_quality_warnings() {
        let mut analysis = analysis();
        analysis.platforms.insert(Platform::Cms);
        let epics = vec![retrieved()];

        let warnings = quality_warnings(&epics, &analysis);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].starts_with("Low epic count: 1 epics"));
        assert!(warnings[1].starts_with("Low custom epic generation: only 0"));
        assert_eq!(warnings[2], "Missing platform coverage: CMS have no tasks");
    }

    #[test]
    fn test_small_epic_warning() {
        let one_task = |name: &str| {
            let hours = efforts(&[(Platform::Flutter, 1), (Platform::Api, 1)]);
            Epic::new(name, "")
                .with_source(AI_GENERATED_SOURCE)
                .with_task(Task::new("t", hours, EstimationMethod::Ai))
        };
        let epics: Vec<Epic> = (0..20).map(|i| one_task(&format!("E{}", i))).collect();
        let warnings = quality_warnings(&epics, &analysis());
        assert_eq!(
            warnings,
            vec!["Many small epics: 20 of 20 epics have fewer than 2 tasks".to_string()]
        );
    }
}
