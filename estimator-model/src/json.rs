//! Turning model text into typed JSON payloads.

use estimator_core::{EstimatorError, Llm, LlmRequest, Result};
use serde::de::DeserializeOwned;

/// Strip surrounding whitespace and a markdown code fence, if present.
pub fn extract_json_payload(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parse model text as `T`. Any failure is an upstream-generation error for
/// `stage`.
pub fn parse_json<T: DeserializeOwned>(stage: &str, text: &str) -> Result<T> {
    let payload = extract_json_payload(text);
    serde_json::from_str(payload).map_err(|e| {
        tracing::error!(
            stage = stage,
            error = %e,
            response_len = text.len(),
            "Model returned invalid JSON"
        );
        EstimatorError::upstream(stage, format!("invalid JSON response: {}", e))
    })
}

/// One model call whose answer must deserialize as `T`.
///
/// A response cut off by the output budget is reported as truncated even if
/// the partial text happens to parse.
pub async fn generate_json<T: DeserializeOwned>(
    llm: &dyn Llm,
    stage: &str,
    request: LlmRequest,
) -> Result<T> {
    let response = llm.generate(request).await?;
    if response.is_truncated() {
        return Err(EstimatorError::upstream(
            stage,
            "response truncated by the output token budget; raise max_tokens",
        ));
    }
    parse_json(stage, &response.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockLlm;
    use estimator_core::{FinishReason, LlmResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        domain: String,
    }

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"domain\": \"fintech\"}\n```";
        assert_eq!(extract_json_payload(text), "{\"domain\": \"fintech\"}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(extract_json_payload("```\n[1, 2]\n```  "), "[1, 2]");
        assert_eq!(extract_json_payload("  {}  "), "{}");
    }

    #[test]
    fn invalid_json_is_upstream_error() {
        let err = parse_json::<Payload>("analyzer", "Sure! Here is your JSON").unwrap_err();
        assert!(err.is_upstream_generation());
        assert!(err.to_string().contains("analyzer"));
    }

    #[test]
    fn wrong_shape_is_upstream_error() {
        let err = parse_json::<Payload>("analyzer", "{\"features\": []}").unwrap_err();
        assert!(err.is_upstream_generation());
    }

    #[tokio::test]
    async fn generate_json_parses_fenced_response() {
        let llm = MockLlm::new("mock").with_text("```json\n{\"domain\": \"health\"}\n```");
        let payload: Payload = generate_json(&llm, "analyzer", LlmRequest::new("p")).await.unwrap();
        assert_eq!(payload, Payload { domain: "health".to_string() });
    }

    #[tokio::test]
    async fn generate_json_rejects_truncated_response() {
        let truncated =
            LlmResponse::new("{\"domain\": \"x\"}").with_finish_reason(FinishReason::MaxTokens);
        let llm = MockLlm::new("mock").with_response(truncated);
        let err =
            generate_json::<Payload>(&llm, "generator", LlmRequest::new("p")).await.unwrap_err();
        assert!(err.is_upstream_generation());
        assert!(err.to_string().contains("truncated"));
    }
}
