//! Configuration types for the OpenAI provider.

use serde::{Deserialize, Serialize};

/// Default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI API or an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key, sent as a bearer token.
    pub api_key: String,
    /// Model name (e.g., "gpt-5.2", "gpt-4o-mini").
    pub model: String,
    /// Optional custom base URL for compatible APIs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default output budget when a request does not set one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Send `max_tokens` instead of `max_completion_tokens`. Older
    /// compatible servers only understand the former.
    #[serde(default)]
    pub legacy_max_tokens: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    180
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-5.2".to_string(),
            base_url: None,
            max_tokens: None,
            legacy_max_tokens: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), ..Default::default() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_legacy_max_tokens(mut self, legacy: bool) -> Self {
        self.legacy_max_tokens = legacy;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_BASE)
    }
}
