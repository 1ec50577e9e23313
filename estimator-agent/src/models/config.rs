//! Configuration for the estimation pipeline.
//!
//! Settings come from environment variables (after `.env` is loaded by the
//! binary). Every value is validated on load so a bad setting fails before
//! the first model call, with a suggestion for the fix.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENAI_API_KEY` | required for live runs |
//! | `ESTIMATOR_MODEL` | `gpt-5.2` |
//! | `ESTIMATOR_EMBEDDING_MODEL` | `text-embedding-3-small` |
//! | `ESTIMATOR_BASE_URL` | OpenAI |
//! | `ESTIMATOR_TEMPERATURE` | `0.4` |
//! | `ESTIMATOR_JSON_TEMPERATURE` | `0.3` |
//! | `ESTIMATOR_ANALYSIS_MAX_TOKENS` | `8000` |
//! | `ESTIMATOR_GENERATION_MAX_TOKENS` | `16000` |
//! | `ESTIMATOR_SIMILARITY_TOP_K` | `5` |
//! | `ESTIMATOR_SIMILARITY_THRESHOLD` | `0.4` |
//! | `ESTIMATOR_FALLBACK_TOP_K` | `25` |
//! | `ESTIMATOR_MAX_GENERATION_ATTEMPTS` | `2` |
//! | `ESTIMATOR_MIN_TOTAL_HOURS` | `10` |
//! | `ESTIMATOR_MAX_TOTAL_HOURS` | `20000` |
//! | `ESTIMATOR_MANDATORY_EPICS_PATH` | built-in catalog |
//! | `ESTIMATOR_DATABASE_URL` | in-memory store |
//! | `ESTIMATOR_LOG_LEVEL` | `info` |
//! | `ESTIMATOR_LOG_FORMAT` | `pretty` |

use estimator_telemetry::{LogFormat, LogSettings};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Maximum allowed value for either output token budget.
pub const MAX_TOKENS_LIMIT: u32 = 1_000_000;

/// Maximum allowed number of generation attempts per request.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Validation error with context and suggestions.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Description of the error
    pub message: String,
    /// Suggested fix or valid values
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for estimator_core::EstimatorError {
    fn from(err: ValidationError) -> Self {
        estimator_core::EstimatorError::config(err.to_string())
    }
}

/// Complete estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// OpenAI API key. Never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature for epic generation.
    pub temperature: f32,
    /// Sampling temperature for requirement analysis.
    pub json_temperature: f32,
    pub analysis_max_tokens: u32,
    pub generation_max_tokens: u32,
    pub similarity_top_k: usize,
    pub similarity_threshold: f32,
    pub fallback_top_k: usize,
    /// Generation attempts per request, the first one included.
    pub max_generation_attempts: u32,
    pub min_total_hours: u32,
    pub max_total_hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory_epics_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-5.2".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
            temperature: 0.4,
            json_temperature: 0.3,
            analysis_max_tokens: 8000,
            generation_max_tokens: 16000,
            similarity_top_k: 5,
            similarity_threshold: 0.4,
            fallback_top_k: 25,
            max_generation_attempts: 2,
            min_total_hours: 10,
            max_total_hours: 20_000,
            mandatory_epics_path: None,
            database_url: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: FromStr>(
    field: &str,
    var: &str,
    raw: &str,
    expected: &str,
) -> Result<T, ValidationError> {
    raw.trim().parse::<T>().map_err(|_| {
        ValidationError::new(field, format!("{} has invalid value '{}'", var, raw))
            .with_suggestion(format!("Set {} to {}", var, expected))
    })
}

impl EstimatorConfig {
    /// Load from the process environment and validate.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source and validate. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("ESTIMATOR_MODEL") {
            config.model = model;
        }
        if let Some(model) = get("ESTIMATOR_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config.base_url = get("ESTIMATOR_BASE_URL");

        if let Some(raw) = get("ESTIMATOR_TEMPERATURE") {
            config.temperature =
                parse_var("temperature", "ESTIMATOR_TEMPERATURE", &raw, "a number like 0.4")?;
        }
        if let Some(raw) = get("ESTIMATOR_JSON_TEMPERATURE") {
            config.json_temperature = parse_var(
                "json_temperature",
                "ESTIMATOR_JSON_TEMPERATURE",
                &raw,
                "a number like 0.3",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_ANALYSIS_MAX_TOKENS") {
            config.analysis_max_tokens = parse_var(
                "analysis_max_tokens",
                "ESTIMATOR_ANALYSIS_MAX_TOKENS",
                &raw,
                "a positive integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_GENERATION_MAX_TOKENS") {
            config.generation_max_tokens = parse_var(
                "generation_max_tokens",
                "ESTIMATOR_GENERATION_MAX_TOKENS",
                &raw,
                "a positive integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_SIMILARITY_TOP_K") {
            config.similarity_top_k = parse_var(
                "similarity_top_k",
                "ESTIMATOR_SIMILARITY_TOP_K",
                &raw,
                "a positive integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_SIMILARITY_THRESHOLD") {
            config.similarity_threshold = parse_var(
                "similarity_threshold",
                "ESTIMATOR_SIMILARITY_THRESHOLD",
                &raw,
                "a number between 0.0 and 1.0",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_FALLBACK_TOP_K") {
            config.fallback_top_k = parse_var(
                "fallback_top_k",
                "ESTIMATOR_FALLBACK_TOP_K",
                &raw,
                "a positive integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_MAX_GENERATION_ATTEMPTS") {
            config.max_generation_attempts = parse_var(
                "max_generation_attempts",
                "ESTIMATOR_MAX_GENERATION_ATTEMPTS",
                &raw,
                "a positive integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_MIN_TOTAL_HOURS") {
            config.min_total_hours = parse_var(
                "min_total_hours",
                "ESTIMATOR_MIN_TOTAL_HOURS",
                &raw,
                "a non-negative integer",
            )?;
        }
        if let Some(raw) = get("ESTIMATOR_MAX_TOTAL_HOURS") {
            config.max_total_hours = parse_var(
                "max_total_hours",
                "ESTIMATOR_MAX_TOTAL_HOURS",
                &raw,
                "a positive integer",
            )?;
        }
        config.mandatory_epics_path = get("ESTIMATOR_MANDATORY_EPICS_PATH").map(PathBuf::from);
        config.database_url = get("ESTIMATOR_DATABASE_URL");
        if let Some(level) = get("ESTIMATOR_LOG_LEVEL") {
            config.log_level = level.trim().to_lowercase();
        }
        if let Some(raw) = get("ESTIMATOR_LOG_FORMAT") {
            config.log_format = raw.parse().map_err(|e: String| {
                ValidationError::new("log_format", e).with_suggestion("Use 'pretty' or 'json'")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model.trim().is_empty() {
            return Err(ValidationError::new("model", "Model name cannot be empty")
                .with_suggestion("Set ESTIMATOR_MODEL, e.g. 'gpt-5.2'"));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(ValidationError::new(
                "embedding_model",
                "Embedding model name cannot be empty",
            )
            .with_suggestion("Set ESTIMATOR_EMBEDDING_MODEL, e.g. 'text-embedding-3-small'"));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::new(
                    "base_url",
                    format!("'{}' is not an http(s) URL", url),
                )
                .with_suggestion("Use a URL like 'http://localhost:8000/v1'"));
            }
        }

        for (field, value) in [
            ("temperature", self.temperature),
            ("json_temperature", self.json_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ValidationError::new(
                    field,
                    format!("Temperature {} is out of range", value),
                )
                .with_suggestion("Use a value between 0.0 and 2.0"));
            }
        }

        for (field, value) in [
            ("analysis_max_tokens", self.analysis_max_tokens),
            ("generation_max_tokens", self.generation_max_tokens),
        ] {
            if value == 0 || value > MAX_TOKENS_LIMIT {
                return Err(ValidationError::new(
                    field,
                    format!("Token budget {} is out of range", value),
                )
                .with_suggestion(format!("Use a value between 1 and {}", MAX_TOKENS_LIMIT)));
            }
        }

        if self.similarity_top_k == 0 {
            return Err(ValidationError::new("similarity_top_k", "Top-K must be greater than 0")
                .with_suggestion("The default is 5"));
        }
        if self.fallback_top_k == 0 {
            return Err(ValidationError::new(
                "fallback_top_k",
                "Fallback top-K must be greater than 0",
            )
            .with_suggestion("The default is 25"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ValidationError::new(
                "similarity_threshold",
                format!("Threshold {} is out of range", self.similarity_threshold),
            )
            .with_suggestion("Use a value between 0.0 and 1.0"));
        }

        if self.max_generation_attempts == 0 || self.max_generation_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ValidationError::new(
                "max_generation_attempts",
                format!("{} generation attempts is out of range", self.max_generation_attempts),
            )
            .with_suggestion(format!("Use a value between 1 and {}", MAX_ATTEMPTS_LIMIT)));
        }

        if self.min_total_hours >= self.max_total_hours {
            return Err(ValidationError::new(
                "min_total_hours",
                format!(
                    "Minimum total hours {} must be below the maximum {}",
                    self.min_total_hours, self.max_total_hours
                ),
            )
            .with_suggestion("The defaults are 10 and 20000"));
        }

        if let Some(path) = &self.mandatory_epics_path {
            if !path.is_file() {
                return Err(ValidationError::new(
                    "mandatory_epics_path",
                    format!("'{}' is not a readable file", path.display()),
                )
                .with_suggestion(
                    "Unset ESTIMATOR_MANDATORY_EPICS_PATH to use the built-in catalog",
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ValidationError::new(
                "log_level",
                format!("Invalid log level '{}'", self.log_level),
            )
            .with_suggestion(format!("Valid log levels: {:?}", valid_levels)));
        }

        Ok(())
    }

    /// The API key, or an error explaining how to set one.
    pub fn require_api_key(&self) -> Result<&str, ValidationError> {
        self.api_key.as_deref().ok_or_else(|| {
            ValidationError::new("api_key", "OPENAI_API_KEY is not set")
                .with_suggestion("Export OPENAI_API_KEY or add it to .env")
        })
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings::new(self.log_level.clone()).with_format(self.log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<EstimatorConfig, ValidationError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EstimatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, EstimatorConfig::default());
        assert_eq!(config.max_generation_attempts, 2);
        assert_eq!(config.generation_max_tokens, 16000);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("ESTIMATOR_MODEL", "gpt-4o-mini"),
            ("ESTIMATOR_SIMILARITY_TOP_K", "8"),
            ("ESTIMATOR_SIMILARITY_THRESHOLD", "0.55"),
            ("ESTIMATOR_LOG_LEVEL", "DEBUG"),
            ("ESTIMATOR_LOG_FORMAT", "json"),
            ("ESTIMATOR_DATABASE_URL", "sqlite://kb.db"),
        ])
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.similarity_top_k, 8);
        assert!((config.similarity_threshold - 0.55).abs() < f32::EPSILON);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("sqlite://kb.db"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("OPENAI_API_KEY", "  "), ("ESTIMATOR_MODEL", "")]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gpt-5.2");
    }

    #[test]
    fn test_unparseable_number() {
        let err = load(&[("ESTIMATOR_SIMILARITY_TOP_K", "five")]).unwrap_err();
        assert_eq!(err.field, "similarity_top_k");
        assert!(err.suggestion.is_some());
    }

    fn rejected_field(pairs: &[(&str, &str)]) -> String {
        load(pairs).unwrap_err().field
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(rejected_field(&[("ESTIMATOR_TEMPERATURE", "3.5")]), "temperature");
        assert_eq!(
            rejected_field(&[("ESTIMATOR_SIMILARITY_THRESHOLD", "1.2")]),
            "similarity_threshold"
        );
        assert_eq!(
            rejected_field(&[("ESTIMATOR_MAX_GENERATION_ATTEMPTS", "0")]),
            "max_generation_attempts"
        );
        assert_eq!(
            rejected_field(&[("ESTIMATOR_GENERATION_MAX_TOKENS", "0")]),
            "generation_max_tokens"
        );
        assert_eq!(
            rejected_field(&[
                ("ESTIMATOR_MIN_TOTAL_HOURS", "500"),
                ("ESTIMATOR_MAX_TOTAL_HOURS", "100")
            ]),
            "min_total_hours"
        );
        assert_eq!(rejected_field(&[("ESTIMATOR_LOG_LEVEL", "loud")]), "log_level");
        assert_eq!(rejected_field(&[("ESTIMATOR_LOG_FORMAT", "xml")]), "log_format");
        assert_eq!(rejected_field(&[("ESTIMATOR_BASE_URL", "localhost:8000")]), "base_url");
    }

    #[test]
    fn test_missing_mandatory_file() {
        let path = "/definitely/not/here.json";
        assert_eq!(
            rejected_field(&[("ESTIMATOR_MANDATORY_EPICS_PATH", path)]),
            "mandatory_epics_path"
        );
    }

    #[test]
    fn test_error_display_includes_suggestion() {
        let err = ValidationError::new("model", "empty").with_suggestion("Set ESTIMATOR_MODEL");
        assert_eq!(err.to_string(), "model: empty. Set ESTIMATOR_MODEL");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = load(&[("OPENAI_API_KEY", "sk-secret")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
