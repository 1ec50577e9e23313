//! Wire types for the chat-completions endpoint.

use estimator_core::{FinishReason, LlmRequest, LlmResponse, UsageMetadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

pub fn request_to_messages(request: &LlmRequest) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(Message { role: "system".to_string(), content: Some(system.clone()) });
    }
    messages.push(Message { role: "user".to_string(), content: Some(request.prompt.clone()) });
    messages
}

pub fn finish_reason(raw: Option<&str>) -> Option<FinishReason> {
    raw.map(|reason| match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::Safety,
        _ => FinishReason::Other,
    })
}

/// Convert the first choice into an [`LlmResponse`]. `None` if the provider
/// returned no choices.
pub fn to_llm_response(response: ChatCompletionResponse) -> Option<LlmResponse> {
    let usage_metadata = response.usage.map(|u| UsageMetadata {
        prompt_token_count: u.prompt_tokens,
        candidates_token_count: u.completion_tokens,
        total_token_count: u.total_tokens,
    });
    let choice = response.choices.into_iter().next()?;

    Some(LlmResponse {
        text: choice.message.content.unwrap_or_default().trim().to_string(),
        finish_reason: finish_reason(choice.finish_reason.as_deref()),
        usage_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_system_first() {
        let request = LlmRequest::new("hello").with_system("be terse");
        let messages = request_to_messages(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_length_maps_to_max_tokens() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": " {\"a\": 1 "},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response: ChatCompletionResponse = serde_json::from_value(raw).unwrap();
        let converted = to_llm_response(response).unwrap();
        assert!(converted.is_truncated());
        assert_eq!(converted.text, "{\"a\": 1");
        assert_eq!(converted.usage_metadata.unwrap().total_token_count, 15);
    }

    #[test]
    fn test_empty_choices() {
        let response = ChatCompletionResponse { choices: vec![], usage: None };
        assert!(to_llm_response(response).is_none());
    }
}
