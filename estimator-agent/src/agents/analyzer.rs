//! Requirement analysis: free text to [`AnalyzedRequirement`].
//!
//! One model call produces the structured reading; keyword heuristics over the
//! original text then correct the platform set, because models routinely
//! confuse an admin dashboard with an end-user web app.

use super::prompts::ANALYSIS_INSTRUCTION;
use estimator_core::{
    AnalyzedRequirement, Complexity, Llm, LlmRequest, Platform, ProjectRequirement, Result,
};
use estimator_model::generate_json;
use estimator_telemetry::metrics;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const STAGE: &str = "analyzer";

const MOBILE_SIGNALS: &[&str] =
    &["mobile app", "android", "ios", "mobile application", "mobile device"];

const WEB_USER_SIGNALS: &[&str] = &[
    "web application for users",
    "web app for users",
    "browser-based app",
    "users access via browser",
    "web-based application for customers",
    "responsive web application",
    "responsive web app",
    "web application enabling users",
    "web app enabling users",
    "across devices",
    "mobile and web",
    "mobile apps as well as",
    "in addition to mobile",
    "along with a web",
];

const ADMIN_SIGNALS: &[&str] = &[
    "admin dashboard",
    "web-based dashboard",
    "admin panel",
    "management console",
    "admin portal",
    "web dashboard for admin",
    "admins will have access to a web",
];

/// Model output before normalization. Every field is optional so a sparse
/// but well-formed answer still parses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    project_name: Option<String>,
    domain: String,
    features: Vec<String>,
    tech_stack: Vec<String>,
    platforms: Vec<String>,
    complexity: Option<String>,
    user_types: Vec<String>,
    initial_epics: Vec<String>,
    epic_categories: BTreeMap<String, Vec<String>>,
    special_requirements: Vec<String>,
}

/// Which keyword groups occur in a requirement text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformSignals {
    pub mobile: bool,
    pub web_users: bool,
    pub admin: bool,
}

impl PlatformSignals {
    pub fn detect(text: &str) -> Self {
        let text = text.to_lowercase();
        let any = |signals: &[&str]| signals.iter().any(|s| text.contains(s));
        Self {
            mobile: any(MOBILE_SIGNALS),
            web_users: any(WEB_USER_SIGNALS),
            admin: any(ADMIN_SIGNALS),
        }
    }
}

/// Correct a model-detected platform set against the requirement text.
pub fn correct_platforms(
    detected: BTreeSet<Platform>,
    signals: PlatformSignals,
) -> BTreeSet<Platform> {
    let mut platforms = detected;

    let admin_only_web = signals.mobile && !signals.web_users && signals.admin;
    if platforms.contains(&Platform::WebApp) && admin_only_web {
        info!("Web App detected for an admin-only web surface; using CMS instead");
        platforms.remove(&Platform::WebApp);
        platforms.insert(Platform::Cms);
    }
    if signals.mobile && platforms.insert(Platform::Flutter) {
        info!("Mobile signals found; added Flutter");
    }
    if signals.admin && platforms.insert(Platform::Cms) {
        info!("Admin signals found; added CMS");
    }

    if platforms.is_empty() {
        warn!("No platforms detected; defaulting to Flutter and API");
        platforms.insert(Platform::Flutter);
    }
    platforms.insert(Platform::Api);
    platforms
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

pub struct RequirementAnalyzer {
    llm: Arc<dyn Llm>,
    temperature: f32,
    max_tokens: u32,
}

impl RequirementAnalyzer {
    pub fn new(llm: Arc<dyn Llm>, temperature: f32, max_tokens: u32) -> Self {
        Self { llm, temperature, max_tokens }
    }

    /// Analyze `requirement`. A response that is not the expected JSON is an
    /// upstream-generation error; this stage is never retried.
    #[instrument(skip_all, fields(stage = STAGE, project = %requirement.project_name))]
    pub async fn analyze(&self, requirement: &ProjectRequirement) -> Result<AnalyzedRequirement> {
        let request = LlmRequest::new(requirement.to_prompt_text())
            .with_system(ANALYSIS_INSTRUCTION)
            .json(self.temperature, self.max_tokens);

        metrics().record_model_call(STAGE);
        let raw: RawAnalysis = generate_json(self.llm.as_ref(), STAGE, request).await?;
        let analysis = self.normalize(requirement, raw);

        info!(
            domain = %analysis.domain,
            features = analysis.features.len(),
            platforms = ?analysis.platforms,
            complexity = %analysis.complexity,
            initial_epics = analysis.initial_epics.len(),
            epic_categories = analysis.epic_categories.len(),
            user_types = analysis.user_types.len(),
            "Requirement analyzed"
        );
        Ok(analysis)
    }

    fn normalize(&self, requirement: &ProjectRequirement, raw: RawAnalysis) -> AnalyzedRequirement {
        let mut detected = BTreeSet::new();
        for label in &raw.platforms {
            match Platform::normalize(label) {
                Some(platform) => {
                    detected.insert(platform);
                }
                None => warn!(platform = %label, "Dropping unknown platform from analysis"),
            }
        }
        let signals = PlatformSignals::detect(&requirement.searchable_text());
        let platforms = correct_platforms(detected, signals);

        let epic_categories = raw
            .epic_categories
            .into_iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, features)| (name.trim().to_string(), clean_list(features)))
            .collect();

        AnalyzedRequirement {
            project_name: raw
                .project_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| requirement.project_name.clone()),
            domain: match raw.domain.trim() {
                "" => "general".to_string(),
                domain => domain.to_string(),
            },
            features: clean_list(raw.features),
            tech_stack: clean_list(raw.tech_stack),
            platforms,
            complexity: raw.complexity.as_deref().map(Complexity::from_label).unwrap_or_default(),
            user_types: clean_list(raw.user_types).into_iter().collect(),
            initial_epics: clean_list(raw.initial_epics),
            epic_categories,
            special_requirements: clean_list(raw.special_requirements),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimator_model::MockLlm;
    use serde_json::json;

    fn set(platforms: &[Platform]) -> BTreeSet<Platform> {
        platforms.iter().copied().collect()
    }

    #[test]
    fn test_signal_detection() {
        let signals = PlatformSignals::detect("An iOS app with an Admin Panel");
        assert!(signals.mobile);
        assert!(signals.admin);
        assert!(!signals.web_users);
    }

    #[test]
    fn test_admin_web_app_becomes_cms() {
        let signals = PlatformSignals { mobile: true, web_users: false, admin: true };
        let result = correct_platforms(set(&[Platform::Flutter, Platform::WebApp]), signals);
        assert_eq!(result, set(&[Platform::Flutter, Platform::Api, Platform::Cms]));
    }

    #[test]
    fn test_web_users_keep_web_app() {
        let signals = PlatformSignals { mobile: true, web_users: true, admin: true };
        let result = correct_platforms(set(&[Platform::WebApp]), signals);
        assert_eq!(
            result,
            set(&[Platform::Flutter, Platform::WebApp, Platform::Api, Platform::Cms])
        );
    }

    #[test]
    fn test_empty_defaults_to_flutter_and_api() {
        let result = correct_platforms(BTreeSet::new(), PlatformSignals::default());
        assert_eq!(result, set(&[Platform::Flutter, Platform::Api]));
    }

    #[test]
    fn test_api_always_added() {
        let result = correct_platforms(set(&[Platform::WebApp]), PlatformSignals::default());
        assert_eq!(result, set(&[Platform::WebApp, Platform::Api]));
    }

    #[tokio::test]
    async fn test_analyze_normalizes_model_output() {
        let llm = Arc::new(MockLlm::new("mock").with_json(json!({
            "domain": " food delivery ",
            "features": ["order_tracking", " ", "payments"],
            "platforms": ["Mobile", "Web Service", "Hologram"],
            "complexity": "High",
            "initial_epics": ["Order Tracking", "Payments"],
            "epic_categories": {"Order Tracking": ["order_tracking"], "Payments": ["payments"]},
            "user_types": ["Customer", "Admin", "Customer"]
        })));
        let analyzer = RequirementAnalyzer::new(llm.clone(), 0.3, 8000);
        let requirement = ProjectRequirement::new("Eats", "A food delivery app");

        let analysis = analyzer.analyze(&requirement).await.unwrap();

        assert_eq!(analysis.project_name, "Eats");
        assert_eq!(analysis.domain, "food delivery");
        assert_eq!(analysis.features, vec!["order_tracking", "payments"]);
        assert_eq!(analysis.platforms, set(&[Platform::Flutter, Platform::Api]));
        assert_eq!(analysis.complexity, Complexity::Complex);
        assert_eq!(analysis.user_types.len(), 2);
        assert_eq!(analysis.epic_categories["Payments"], vec!["payments"]);

        let sent = &llm.requests()[0];
        assert!(sent.prompt.starts_with("Project Name: Eats\nDescription: A food delivery app"));
        assert!(sent.config.as_ref().unwrap().json_mode);
    }

    #[tokio::test]
    async fn test_missing_complexity_is_medium() {
        let analysis = json!({"domain": "crm", "platforms": ["Web App"]});
        let llm = Arc::new(MockLlm::new("mock").with_json(analysis));
        let analysis = RequirementAnalyzer::new(llm, 0.3, 8000)
            .analyze(&ProjectRequirement::new("CRM", "Sales tracking"))
            .await
            .unwrap();
        assert_eq!(analysis.complexity, Complexity::Medium);
        assert_eq!(analysis.platforms, set(&[Platform::WebApp, Platform::Api]));
    }

    #[tokio::test]
    async fn test_malformed_response_is_upstream_error() {
        let llm = Arc::new(MockLlm::new("mock").with_text("I think this is a mobile app."));
        let err = RequirementAnalyzer::new(llm.clone(), 0.3, 8000)
            .analyze(&ProjectRequirement::new("X", "Y"))
            .await
            .unwrap_err();
        assert!(err.is_upstream_generation());
        assert_eq!(llm.requests().len(), 1);
    }
}
