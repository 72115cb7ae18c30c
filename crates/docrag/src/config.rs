//! Configuration handling for docrag.
//!
//! Settings load from an optional TOML file, with `DOCRAG_*` environment
//! variables layered on top. Credentials only ever come from the environment.

use docrag_core::{DistanceMetric, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreSettings,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalSettings,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider key: `openai` or `hash`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name for remote providers
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; `DOCRAG_OPENAI_API_KEY` wins over any file value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Texts per provider call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent provider calls (1 = sequential)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_batch_size() -> usize {
    64
}

fn default_max_concurrent() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend key: `memory` or `lancedb`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Persistence path for on-disk backends
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Distance metric the backend is configured with
    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_backend() -> String {
    "lancedb".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/docrag.lance")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            metric: DistanceMetric::default(),
        }
    }
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    /// Target passage size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap carried between consecutive passages
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    200
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Default result count
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Default score floor
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Candidate count for context assembly
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,

    /// Characters-per-token estimate for the context budget
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Default context token budget
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.7
}

fn default_context_top_k() -> usize {
    10
}

fn default_chars_per_token() -> usize {
    4
}

fn default_max_context_tokens() -> usize {
    2000
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            context_top_k: default_context_top_k(),
            chars_per_token: default_chars_per_token(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("invalid config file: {e}")))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `DOCRAG_*` environment variables on top of the loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DOCRAG_EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_OPENAI_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DOCRAG_OPENAI_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_STORE_BACKEND") {
            self.store.backend = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_DB_PATH") {
            self.store.db_path = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.max_concurrent, 1);
        assert_eq!(config.store.backend, "lancedb");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.min_score - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking]
            chunk_size = 500

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.embedding.provider, "openai");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = RagConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = RagConfig::default();
        let encoded = toml::to_string(&config).unwrap();
        let decoded: RagConfig = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.embedding.model, config.embedding.model);
        assert_eq!(decoded.store.db_path, config.store.db_path);
    }
}
