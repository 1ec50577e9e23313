//! OpenAI embeddings endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings via `POST {base_url}/embeddings`.
pub struct OpenAIEmbeddingProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    pub const DEFAULT_MODEL: &'static str = "text-embedding-3-small";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = match model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::embedding(PROVIDER, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::embedding(PROVIDER, format!("API error ({}): {}", status, body)));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("invalid response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::embedding(
                PROVIDER,
                format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
