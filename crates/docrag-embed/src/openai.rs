//! OpenAI-compatible embedding provider.
//!
//! Talks to the `/embeddings` endpoint of the OpenAI API (or any compatible
//! server via `base_url`). The endpoint accepts a batch of inputs natively,
//! so one request covers one sub-batch.

use async_trait::async_trait;
use docrag_core::{EmbedError, EmbeddingOutput, EmbeddingProvider};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Embedding dimension per supported model.
const MODEL_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`OpenAiEmbedder`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key; must be non-empty
    pub api_key: String,
    /// Model name; must be one of the supported models
    pub model: String,
    /// API base URL, trailing slash tolerated
    pub base_url: String,
    /// Bounded per-request timeout
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// OpenAI-compatible embedding provider.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder.
    ///
    /// Fails at construction for an unknown model or a missing API key, so a
    /// partially configured provider never starts serving.
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbedError> {
        let dimension = MODEL_DIMENSIONS
            .iter()
            .find(|(name, _)| *name == config.model)
            .map(|(_, dim)| *dim)
            .ok_or_else(|| EmbedError::UnknownModel(config.model.clone()))?;

        if config.api_key.is_empty() {
            return Err(EmbedError::MissingCredentials(
                "OpenAI API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbedError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
            dimension,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
}

/// Validate a response payload and convert it into ordered outputs.
///
/// Billed tokens are spread evenly across outputs; the remainder lands on the
/// first.
fn outputs_from_response(
    mut response: EmbeddingsResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<EmbeddingOutput>, EmbedError> {
    if response.data.len() != expected {
        return Err(EmbedError::Response(format!(
            "expected {expected} embeddings, got {}",
            response.data.len()
        )));
    }

    response.data.sort_by_key(|d| d.index);

    let total_tokens = response.usage.map_or(0, |u| u.prompt_tokens);
    let per_text = total_tokens / expected as u64;
    let remainder = total_tokens % expected as u64;

    response
        .data
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            if data.embedding.len() != dimension {
                return Err(EmbedError::Response(format!(
                    "embedding {} has dimension {}, expected {dimension}",
                    data.index,
                    data.embedding.len()
                )));
            }
            Ok(EmbeddingOutput {
                embedding: data.embedding,
                prompt_tokens: per_text + if i == 0 { remainder } else { 0 },
            })
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        debug!(model = %self.model, count = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Response(e.to_string()))?;

        outputs_from_response(payload, texts.len(), self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, key: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_known_models_have_dimensions() {
        let embedder = OpenAiEmbedder::new(config("text-embedding-3-small", "sk-test")).unwrap();
        assert_eq!(embedder.dimension(), 1536);
        assert_eq!(embedder.model_name(), "text-embedding-3-small");

        let embedder = OpenAiEmbedder::new(config("text-embedding-3-large", "sk-test")).unwrap();
        assert_eq!(embedder.dimension(), 3072);
    }

    #[test]
    fn test_unknown_model_rejected_at_construction() {
        let err = OpenAiEmbedder::new(config("gpt-4o", "sk-test")).unwrap_err();
        assert!(matches!(err, EmbedError::UnknownModel(_)));
        assert!(err.to_string().contains("gpt-4o"));
    }

    #[test]
    fn test_missing_api_key_rejected_at_construction() {
        let err = OpenAiEmbedder::new(config("text-embedding-3-small", "")).unwrap_err();
        assert!(matches!(err, EmbedError::MissingCredentials(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut cfg = config("text-embedding-3-small", "sk-test");
        cfg.base_url = "http://localhost:8080/v1/".to_string();
        let embedder = OpenAiEmbedder::new(cfg).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:8080/v1");
    }

    fn response_json(payload: &str) -> EmbeddingsResponse {
        serde_json::from_str(payload).unwrap()
    }

    #[test]
    fn test_outputs_sorted_by_index() {
        let response = response_json(
            r#"{
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ],
                "usage": {"prompt_tokens": 9}
            }"#,
        );

        let outputs = outputs_from_response(response, 2, 2).unwrap();
        assert_eq!(outputs[0].embedding, vec![1.0, 0.0]);
        assert_eq!(outputs[1].embedding, vec![0.0, 1.0]);
        // 9 tokens over 2 texts: 5 on the first, 4 on the second.
        assert_eq!(outputs[0].prompt_tokens, 5);
        assert_eq!(outputs[1].prompt_tokens, 4);
    }

    #[test]
    fn test_outputs_count_mismatch_rejected() {
        let response = response_json(
            r#"{"data": [{"embedding": [1.0], "index": 0}], "usage": null}"#,
        );
        let err = outputs_from_response(response, 2, 1).unwrap_err();
        assert!(matches!(err, EmbedError::Response(_)));
    }

    #[test]
    fn test_outputs_dimension_mismatch_rejected() {
        let response = response_json(
            r#"{"data": [{"embedding": [1.0, 2.0], "index": 0}], "usage": null}"#,
        );
        let err = outputs_from_response(response, 1, 3).unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn test_missing_usage_means_zero_tokens() {
        let response = response_json(
            r#"{"data": [{"embedding": [1.0], "index": 0}], "usage": null}"#,
        );
        let outputs = outputs_from_response(response, 1, 1).unwrap();
        assert_eq!(outputs[0].prompt_tokens, 0);
    }
}
