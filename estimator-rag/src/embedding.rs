//! Embedding providers.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Turns text into a dense vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. The default calls [`embed`](Self::embed) once per
    /// text; providers with a batch endpoint should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize;
}

/// Offline provider: a signed, hashed bag of lowercase words, L2-normalised.
///
/// Texts sharing words land close together, which is enough to run the
/// estimator without an embeddings API.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub const DEFAULT_DIMENSIONS: usize = 256;

    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = Sha256::digest(token.as_bytes());
            let mut index_bytes = [0u8; 8];
            index_bytes.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(index_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn hashing_is_deterministic_and_normalised() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("User Authentication").await.unwrap();
        let b = provider.embed("user authentication").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_words_score_higher_than_unrelated_text() {
        let provider = HashingEmbeddingProvider::default();
        let query = provider
            .embed("Domain: fintech. Epic: Payments. Features: card payments")
            .await
            .unwrap();
        let related = provider.embed("Payments").await.unwrap();
        let unrelated = provider.embed("Chat").await.unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8);
        let v = provider.embed("   ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn batch_defaults_to_per_text_calls() {
        let provider = HashingEmbeddingProvider::new(16);
        let batch = provider.embed_batch(&["a", "b"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], provider.embed("a").await.unwrap());
    }
}
