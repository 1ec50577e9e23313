use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A hosted completion model.
///
/// Every pipeline stage talks to the model through this trait so that the
/// HTTP client and the scripted mock are interchangeable.
#[async_trait]
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, req: LlmRequest) -> Result<LlmResponse>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub config: Option<GenerateConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Ask the provider for a JSON object response.
    #[serde(default)]
    pub json_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { system: None, prompt: prompt.into(), config: None }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_config(mut self, config: GenerateConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Request a JSON object with the given sampling settings.
    pub fn json(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.config = Some(GenerateConfig {
            temperature: Some(temperature),
            max_output_tokens: Some(max_output_tokens),
            json_mode: true,
        });
        self
    }
}

impl LlmResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), finish_reason: Some(FinishReason::Stop), usage_metadata: None }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    /// The provider stopped because the output budget ran out.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == Some(FinishReason::MaxTokens)
    }
}
