use async_trait::async_trait;
use estimator_core::{EstimatorError, Llm, LlmRequest, LlmResponse, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted model: answers requests with queued responses, in order.
///
/// Requests are recorded so tests can assert on the prompts that were sent.
pub struct MockLlm {
    name: String,
    responses: Mutex<VecDeque<Result<LlmResponse>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(LlmResponse::new(text))
    }

    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_text(value.to_string())
    }

    pub fn with_error(self, error: EstimatorError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<LlmResponse>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(item);
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, req: LlmRequest) -> Result<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req);
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| EstimatorError::model("mock response queue poisoned"))?
            .pop_front();
        next.unwrap_or_else(|| {
            Err(EstimatorError::model(format!("{}: no scripted response left", self.name)))
        })
    }
}
