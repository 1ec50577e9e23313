//! # estimator-model
//!
//! Model access for the estimator pipeline.
//!
//! - [`OpenAIClient`] - chat-completions client for OpenAI and compatible APIs
//! - [`generate_json`] - one model call parsed into a typed JSON payload
//! - [`MockLlm`] - scripted responses for offline runs and tests
//! - [`RetryConfig`] - transport retry policy for transient HTTP failures

pub mod json;
pub mod mock;
pub mod openai;
pub mod retry;

pub use json::{extract_json_payload, generate_json, parse_json};
pub use mock::MockLlm;
pub use openai::{OPENAI_API_BASE, OpenAIClient, OpenAIConfig};
pub use retry::{
    RetryConfig, execute_with_retry, is_retryable_model_error, is_retryable_status_code,
};
