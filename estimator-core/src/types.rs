use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Provenance tag for epics loaded from the mandatory configuration.
pub const MANDATORY_SOURCE: &str = "mandatory_epics.json";

/// Provenance tag for epics invented by the model.
pub const AI_GENERATED_SOURCE: &str = "AI Generated";

/// A target delivery surface that task hours are broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Flutter")]
    Flutter,
    #[serde(rename = "Web App")]
    WebApp,
    #[serde(rename = "API")]
    Api,
    #[serde(rename = "CMS")]
    Cms,
}

impl Platform {
    pub const ALL: [Platform; 4] =
        [Platform::Flutter, Platform::WebApp, Platform::Api, Platform::Cms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Flutter => "Flutter",
            Platform::WebApp => "Web App",
            Platform::Api => "API",
            Platform::Cms => "CMS",
        }
    }

    /// Map a free-form platform name (model output, legacy template rows) onto
    /// a known platform. Returns `None` for names with no mapping.
    pub fn normalize(name: &str) -> Option<Platform> {
        let key = name.trim().to_lowercase();
        let platform = match key.as_str() {
            "flutter" | "mobile" | "mobile app" | "mobile application" | "android" | "ios" => {
                Platform::Flutter
            }
            "web" | "webapp" | "web app" | "web application" | "web based app" => Platform::WebApp,
            "api" | "backend" | "web service" | "webservice" => Platform::Api,
            "cms" | "admin" | "admin panel" | "admin dashboard" | "admin portal"
            | "management console" | "web dashboard" | "web-based dashboard" | "designer" => {
                Platform::Cms
            }
            _ => return None,
        };
        Some(platform)
    }

    /// Upper bound on hours a single task may carry for this platform.
    pub fn hour_cap(&self) -> u32 {
        match self {
            Platform::Cms => 24,
            Platform::Flutter | Platform::WebApp | Platform::Api => 32,
        }
    }

    pub fn is_frontend(&self) -> bool {
        matches!(self, Platform::Flutter | Platform::WebApp)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::normalize(s).ok_or_else(|| format!("unknown platform '{}'", s))
    }
}

/// Coarse project size bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    /// Scale factor applied to rule-based hour estimates.
    pub fn multiplier(&self) -> f64 {
        match self {
            Complexity::Simple => 0.7,
            Complexity::Medium => 1.0,
            Complexity::Complex => 1.5,
        }
    }

    /// Lenient parse of a model-supplied label; unknown labels are medium.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "simple" | "low" | "basic" | "small" => Complexity::Simple,
            "complex" | "high" | "advanced" | "large" | "enterprise" => Complexity::Complex,
            _ => Complexity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task's hours were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Historical,
    PatternMatch,
    Ai,
    RuleBased,
}

/// Hours keyed by platform. Ordered so serialization is stable.
pub type Efforts = BTreeMap<Platform, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    #[serde(default)]
    pub efforts: Efforts,
    #[serde(default = "default_method")]
    pub source: EstimationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

fn default_method() -> EstimationMethod {
    EstimationMethod::Historical
}

impl Task {
    pub fn new(description: impl Into<String>, efforts: Efforts, source: EstimationMethod) -> Self {
        Self { description: description.into(), efforts, source, reasoning: None }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn total_hours(&self) -> u32 {
        self.efforts.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub source_template: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_mandatory: false,
            source_template: String::new(),
            tasks: Vec::new(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    pub fn with_source(mut self, source_template: impl Into<String>) -> Self {
        self.source_template = source_template.into();
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Key used for merge-time uniqueness.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn total_hours(&self) -> u32 {
        self.tasks.iter().map(Task::total_hours).sum()
    }

    /// Platforms that carry at least one hour entry in this epic.
    pub fn platforms(&self) -> BTreeSet<Platform> {
        self.tasks.iter().flat_map(|t| t.efforts.keys().copied()).collect()
    }
}

/// Case-insensitive exact-name key. Not a similarity measure.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// User input for one estimation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequirement {
    pub project_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl ProjectRequirement {
    pub fn new(project_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            description: description.into(),
            additional_context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.additional_context = if context.trim().is_empty() { None } else { Some(context) };
        self
    }

    /// Text block handed to the analyzer prompt.
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Project Name: {}\nDescription: {}\nAdditional Context: {}",
            self.project_name,
            self.description,
            self.additional_context.as_deref().unwrap_or("None")
        )
    }

    /// Lower-cased description and context, used for keyword heuristics.
    pub fn searchable_text(&self) -> String {
        let mut text = self.description.to_lowercase();
        if let Some(context) = &self.additional_context {
            text.push(' ');
            text.push_str(&context.to_lowercase());
        }
        text
    }
}

/// Structured reading of a requirement, produced once by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedRequirement {
    pub project_name: String,
    pub domain: String,
    pub features: Vec<String>,
    pub tech_stack: Vec<String>,
    pub platforms: BTreeSet<Platform>,
    pub complexity: Complexity,
    pub user_types: BTreeSet<String>,
    pub initial_epics: Vec<String>,
    /// Epic name to the features it covers.
    pub epic_categories: BTreeMap<String, Vec<String>>,
    pub special_requirements: Vec<String>,
}

/// Final estimate. Derived totals are computed at construction and only
/// exposed through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEstimation {
    project_name: String,
    target_platforms: BTreeSet<Platform>,
    complexity: Complexity,
    epics: Vec<Epic>,
    total_hours: u32,
    hours_by_platform: BTreeMap<Platform, u32>,
    task_count: usize,
    mandatory_epics_count: usize,
    custom_epics_count: usize,
}

impl ProjectEstimation {
    pub fn from_epics(
        project_name: impl Into<String>,
        target_platforms: BTreeSet<Platform>,
        complexity: Complexity,
        epics: Vec<Epic>,
    ) -> Self {
        let mut hours_by_platform = BTreeMap::new();
        let mut total_hours = 0u32;
        let mut task_count = 0usize;

        for task in epics.iter().flat_map(|e| e.tasks.iter()) {
            task_count += 1;
            for (platform, hours) in &task.efforts {
                *hours_by_platform.entry(*platform).or_insert(0) += *hours;
                total_hours += *hours;
            }
        }

        let mandatory_epics_count = epics.iter().filter(|e| e.is_mandatory).count();
        let custom_epics_count = epics.len() - mandatory_epics_count;

        Self {
            project_name: project_name.into(),
            target_platforms,
            complexity,
            epics,
            total_hours,
            hours_by_platform,
            task_count,
            mandatory_epics_count,
            custom_epics_count,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn target_platforms(&self) -> &BTreeSet<Platform> {
        &self.target_platforms
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn epics(&self) -> &[Epic] {
        &self.epics
    }

    pub fn into_epics(self) -> Vec<Epic> {
        self.epics
    }

    pub fn total_hours(&self) -> u32 {
        self.total_hours
    }

    pub fn hours_by_platform(&self) -> &BTreeMap<Platform, u32> {
        &self.hours_by_platform
    }

    pub fn epic_count(&self) -> usize {
        self.epics.len()
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn mandatory_epics_count(&self) -> usize {
        self.mandatory_epics_count
    }

    pub fn custom_epics_count(&self) -> usize {
        self.custom_epics_count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn efforts(pairs: &[(Platform, u32)]) -> Efforts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_platform_normalize() {
        assert_eq!(Platform::normalize("Web"), Some(Platform::WebApp));
        assert_eq!(Platform::normalize(" backend "), Some(Platform::Api));
        assert_eq!(Platform::normalize("Web Service"), Some(Platform::Api));
        assert_eq!(Platform::normalize("Designer"), Some(Platform::Cms));
        assert_eq!(Platform::normalize("iOS"), Some(Platform::Flutter));
        assert_eq!(Platform::normalize("Admin Dashboard"), Some(Platform::Cms));
        assert_eq!(Platform::normalize("desktop"), None);
    }

    #[test]
    fn test_platform_serde_names() {
        let json = serde_json::to_string(&Platform::WebApp).unwrap();
        assert_eq!(json, "\"Web App\"");
        let parsed: Platform = serde_json::from_str("\"API\"").unwrap();
        assert_eq!(parsed, Platform::Api);
    }

    #[test]
    fn test_efforts_serialize_as_string_keys() {
        let hours = efforts(&[(Platform::Flutter, 8), (Platform::Api, 12)]);
        let task = Task::new("Login", hours, EstimationMethod::Ai);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["efforts"]["Flutter"], 8);
        assert_eq!(value["efforts"]["API"], 12);
        assert_eq!(value["source"], "ai");
        assert!(value.get("reasoning").is_none());

        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_complexity_from_label() {
        assert_eq!(Complexity::from_label("Complex"), Complexity::Complex);
        assert_eq!(Complexity::from_label("low"), Complexity::Simple);
        assert_eq!(Complexity::from_label("whatever"), Complexity::Medium);
        assert!((Complexity::Simple.multiplier() - 0.7).abs() < f64::EPSILON);
        assert!((Complexity::Complex.multiplier() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_requirement_prompt_text() {
        let req = ProjectRequirement::new("Shop", "An online shop");
        assert_eq!(
            req.to_prompt_text(),
            "Project Name: Shop\nDescription: An online shop\nAdditional Context: None"
        );

        let req = req.with_context("Needs an admin panel");
        assert!(req.to_prompt_text().ends_with("Additional Context: Needs an admin panel"));
        assert!(req.searchable_text().contains("admin panel"));

        let blank = ProjectRequirement::new("x", "y").with_context("   ");
        assert!(blank.additional_context.is_none());
    }

    #[test]
    fn test_estimation_totals() {
        let login = efforts(&[(Platform::Flutter, 8), (Platform::Api, 6)]);
        let checkout = efforts(&[(Platform::Flutter, 10)]);
        let epics = vec![
            Epic::new("Authentication", "")
                .mandatory()
                .with_task(Task::new("Login", login, EstimationMethod::Historical)),
            Epic::new("Payments", "")
                .with_task(Task::new("Checkout", checkout, EstimationMethod::Ai))
                .with_task(Task::new("Refunds", Efforts::new(), EstimationMethod::Ai)),
        ];
        let estimation = ProjectEstimation::from_epics(
            "Shop",
            [Platform::Flutter, Platform::Api].into_iter().collect(),
            Complexity::Medium,
            epics,
        );

        assert_eq!(estimation.total_hours(), 24);
        assert_eq!(estimation.hours_by_platform()[&Platform::Flutter], 18);
        assert_eq!(estimation.hours_by_platform()[&Platform::Api], 6);
        assert_eq!(estimation.task_count(), 3);
        assert_eq!(estimation.mandatory_epics_count(), 1);
        assert_eq!(estimation.custom_epics_count(), 1);
    }

    #[test]
    fn test_name_key_is_exact_modulo_case() {
        assert_eq!(name_key("  My Profile "), "my profile");
        assert_ne!(name_key("Payment"), name_key("Paiment"));
    }
}
