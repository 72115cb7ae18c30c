//! Deterministic embedder for testing without a remote provider.
//!
//! [`HashEmbedder`] derives a unit-length vector from the blake3 hash of the
//! input text. Identical text always maps to the identical vector, so a chunk
//! searched with its own text scores 1.0 on a cosine backend. The vectors
//! carry no semantic signal; this provider exists so the rest of the pipeline
//! can be exercised offline.

use async_trait::async_trait;
use docrag_core::{EmbedError, EmbeddingOutput, EmbeddingProvider};

/// Deterministic blake3-derived embedder.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a hash embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create a hash embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();

        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte = bytes[i % 32];
                // Rotate by position so dimensions beyond 32 stay distinct.
                let rotated = byte.wrapping_add((i / 32) as u8);
                (f32::from(rotated) / 255.0) - 0.5
            })
            .collect();

        let norm: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        } else if let Some(first) = embedding.first_mut() {
            *first = 1.0;
        }
        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts
            .iter()
            .map(|text| EmbeddingOutput {
                embedding: self.embed_one(text),
                prompt_tokens: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_defaults() {
        let embedder = HashEmbedder::new();
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.model_name(), "hash");
    }

    #[test]
    fn test_hash_embedder_custom_dimension() {
        let embedder = HashEmbedder::with_dimension(64);
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.embed_one("x").len(), 64);
    }

    #[test]
    fn test_identical_text_identical_vector() {
        let embedder = HashEmbedder::new();
        assert_eq!(embedder.embed_one("same text"), embedder.embed_one("same text"));
        assert_ne!(embedder.embed_one("same text"), embedder.embed_one("other text"));
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let embedder = HashEmbedder::new();
        for text in ["a", "hello world", "Lorem ipsum dolor sit amet"] {
            let v = embedder.embed_one(text);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
        }
    }

    #[tokio::test]
    async fn test_embed_texts_preserves_order() {
        let embedder = HashEmbedder::new();
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let outputs = embedder.embed_texts(&texts).await.unwrap();

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].embedding, embedder.embed_one("one"));
        assert_eq!(outputs[2].embedding, embedder.embed_one("three"));
        assert_eq!(outputs[0].prompt_tokens, 0);
    }

    #[tokio::test]
    async fn test_embed_query_matches_embed_texts() {
        let embedder = HashEmbedder::new();
        let from_query = embedder.embed_query("a query").await.unwrap();
        let from_batch = embedder
            .embed_texts(&["a query".to_string()])
            .await
            .unwrap();
        assert_eq!(from_query.embedding, from_batch[0].embedding);
    }
}
