//! Pluggable embedding backends.
//!
//! Production uses the OpenAI embeddings API; the deterministic hash
//! embedder exists for tests and offline environments. Both produce
//! unit-norm vectors so cosine similarity behaves the same either way.

use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::{MemoryError, MemoryResult};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Trait for embedding backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed dimension of produced vectors
    fn dimension(&self) -> u64;

    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;
}

/// OpenAI embeddings over reqwest
pub struct OpenAiEmbedding {
    http: Client,
    api_key: String,
    model: String,
    dimension: u64,
}

impl OpenAiEmbedding {
    pub fn new(api_key: String, model: String, timeout_s: u64) -> Self {
        // text-embedding-3-small; the large model doubles the dimension
        let dimension = if model.contains("large") { 3072 } else { 1536 };

        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(timeout_s))
                .build()
                .expect("reqwest client"),
            api_key,
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn dimension(&self) -> u64 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let response = self
            .http
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::Embedding(format!(
                "embeddings API returned {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MemoryError::Embedding(format!("malformed response: {e}")))?;

        let values = body
            .pointer("/data/0/embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| MemoryError::Embedding("missing embedding in response".into()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<f32>>();

        if values.len() as u64 != self.dimension {
            return Err(MemoryError::Embedding(format!(
                "expected dimension {}, got {}",
                self.dimension,
                values.len()
            )));
        }

        Ok(values)
    }
}

/// Deterministic bag-of-words hash embedder.
///
/// Each lowercased token is hashed into a bucket; the vector is the
/// normalized bucket histogram. Texts sharing vocabulary land closer in
/// cosine space, which is all the recall tests need.
pub struct DeterministicEmbedding {
    dimension: u64,
}

impl DeterministicEmbedding {
    pub fn new() -> Self {
        Self { dimension: 256 }
    }
}

impl Default for DeterministicEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbedding {
    fn dimension(&self) -> u64 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension as usize];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_be_bytes(digest[0..8].try_into().unwrap())
                % self.dimension;
            vector[bucket as usize] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_embedding_is_stable() {
        let embedder = DeterministicEmbedding::new();
        let a = embedder.embed("migrate batch ETL to spot").await.unwrap();
        let b = embedder.embed("migrate batch ETL to spot").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_deterministic_embedding_is_unit_norm() {
        let embedder = DeterministicEmbedding::new();
        let v = embedder.embed("some workload description").await.unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_ranks_closer() {
        let embedder = DeterministicEmbedding::new();

        let query = embedder
            .embed("migrate batch ETL to spot with checkpointing")
            .await
            .unwrap();
        let close = embedder
            .embed("spot migration of a batch ETL pipeline with checkpointing enabled")
            .await
            .unwrap();
        let far = embedder
            .embed("right-size an over-provisioned redis cache cluster")
            .await
            .unwrap();

        assert!(cosine(&query, &close) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_embeds_to_zero_vector() {
        let embedder = DeterministicEmbedding::new();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
