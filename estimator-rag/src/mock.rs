use async_trait::async_trait;
use std::sync::Mutex;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Scripted embeddings for tests.
///
/// The first registered fragment contained in the text decides its vector.
/// Text matching no fragment embeds to zeros, which never clears a positive
/// similarity threshold.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    vectors: Vec<(String, Vec<f32>)>,
    failures: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
            failures: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vector(mut self, fragment: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.push((fragment.into(), vector));
        self
    }

    /// Fail every text containing `fragment`.
    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.failures.push(fragment.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        if self.failures.iter().any(|f| text.contains(f.as_str())) {
            return Err(RagError::embedding("mock", format!("scripted failure for '{}'", text)));
        }
        Ok(self
            .vectors
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
            .map(|(_, vector)| vector.clone())
            .unwrap_or_else(|| vec![0.0; self.dimensions]))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
