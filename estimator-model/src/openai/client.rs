//! OpenAI client implementation.

use super::config::OpenAIConfig;
use super::convert::{self, ChatCompletionRequest, ChatCompletionResponse, ResponseFormat};
use crate::retry::{
    RetryConfig, execute_with_retry, is_retryable_model_error, is_retryable_status_code,
};
use async_trait::async_trait;
use estimator_core::{EstimatorError, Llm, LlmRequest, LlmResponse, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::Instrument;

/// Chat-completions client for OpenAI and OpenAI-compatible servers.
///
/// # Example
///
/// ```rust,ignore
/// use estimator_model::{OpenAIClient, OpenAIConfig};
///
/// let client = OpenAIClient::new(OpenAIConfig::new(api_key, "gpt-5.2"))?;
/// ```
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
    retry_config: RetryConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EstimatorError::model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config, retry_config: RetryConfig::default() })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.effective_base_url().trim_end_matches('/'))
    }

    fn build_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let config = request.config.clone().unwrap_or_default();
        let budget = config.max_output_tokens.or(self.config.max_tokens);
        let (max_tokens, max_completion_tokens) =
            if self.config.legacy_max_tokens { (budget, None) } else { (None, budget) };

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: convert::request_to_messages(request),
            temperature: config.temperature,
            max_tokens,
            max_completion_tokens,
            response_format: config
                .json_mode
                .then(|| ResponseFormat { format_type: "json_object".to_string() }),
        }
    }

    async fn send(&self, chat_request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.config.api_key)
            .json(chat_request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                EstimatorError::model(format!("OpenAI API request {}: {}", kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let retryability = if is_retryable_status_code(status.as_u16()) {
                "retryable"
            } else {
                "non-retryable"
            };
            return Err(EstimatorError::model(format!(
                "OpenAI API error ({}, {}): {}",
                status, retryability, error_text
            )));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| EstimatorError::model(format!("Failed to decode OpenAI response: {}", e)))
    }
}

#[async_trait]
impl Llm for OpenAIClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let chat_request = self.build_request(&request);
        let span = estimator_telemetry::model_call_span(&self.config.model);

        let response = execute_with_retry(&self.retry_config, is_retryable_model_error, || {
            self.send(&chat_request)
        })
        .instrument(span)
        .await?;

        let converted = convert::to_llm_response(response)
            .ok_or_else(|| EstimatorError::model("OpenAI API returned no choices"))?;

        if let Some(usage) = &converted.usage_metadata {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Model call completed"
            );
        }

        Ok(converted)
    }
}
