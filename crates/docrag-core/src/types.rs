//! Core types for docrag.
//!
//! This module contains all shared data structures used across docrag:
//!
//! ## Documents and Chunks
//! - [`DocumentRecord`]: bookkeeping for one uploaded document
//! - [`DocumentStatus`]: outcome of the last upload attempt
//! - [`Chunk`]: a passage of document text with its embedding
//! - [`ChunkMetadata`]: per-chunk provenance fields plus caller tags
//!
//! ## Metadata
//! - [`MetadataValue`]: closed set of scalar values accepted by every backend
//! - [`Metadata`]: flat string-keyed map of scalars
//!
//! ## Embeddings
//! - [`EmbeddingOutput`]: one embedding vector plus its billed token count
//! - [`EmbeddingStats`]: cumulative counters for a provider
//!
//! ## Search
//! - [`SearchFilter`]: score floor + AND-combined metadata conditions
//! - [`SearchResult`]: a matching chunk with normalized score and rank
//! - [`DistanceMetric`]: backend-native distance, input to score normalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Metadata
// ============================================================================

/// A metadata value restricted to scalar types.
///
/// Vector backends only accept flat scalar metadata, so nested structures must
/// cross this boundary as JSON-encoded strings; [`MetadataValue::from_json`]
/// and [`MetadataValue::to_json`] are the explicit encode/decode points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Convert a JSON value into a metadata scalar.
    ///
    /// Arrays and objects are stringified rather than rejected.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::Str(s.clone()),
            nested => Self::Str(nested.to_string()),
        }
    }

    /// Convert back into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Flat scalar metadata map.
pub type Metadata = HashMap<String, MetadataValue>;

/// Decode a JSON object into a [`Metadata`] map.
#[must_use]
pub fn metadata_from_json(value: &serde_json::Value) -> Metadata {
    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), MetadataValue::from_json(v)))
            .collect(),
        None => Metadata::new(),
    }
}

/// Encode a [`Metadata`] map as a JSON object.
#[must_use]
pub fn metadata_to_json(metadata: &Metadata) -> serde_json::Value {
    serde_json::Value::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

// ============================================================================
// Documents
// ============================================================================

/// Outcome of the last upload attempt for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Chunks embedded and persisted
    Indexed,
    /// Content produced zero passages; nothing stored
    Empty,
    /// Store write failed; retry by re-uploading
    Error,
}

impl DocumentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Empty => "empty",
            Self::Error => "error",
        }
    }
}

/// Bookkeeping for one uploaded document.
///
/// The `id` is derived from filename and content, so re-uploading identical
/// content yields the same record. Deleting a record cascades to exactly the
/// chunk ids implied by `chunk_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Content-derived identifier, stable across re-uploads
    pub id: String,
    /// Original filename supplied by the caller
    pub filename: String,
    /// Owning tenant
    pub owner_id: i64,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
    /// Caller-supplied metadata, propagated to every chunk
    pub metadata: Metadata,
    /// Number of chunks produced (immutable after creation)
    pub chunk_count: u32,
    /// Outcome of the last upload attempt
    pub status: DocumentStatus,
    /// Store error message if status is Error
    pub error_message: Option<String>,
}

// ============================================================================
// Chunks
// ============================================================================

/// Provenance fields attached to every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Filename of the parent document
    pub filename: String,
    /// Position within the parent document (0-based)
    pub ordinal: u32,
    /// Total chunks in the parent document
    pub total_chunks: u32,
    /// Owning tenant
    pub owner_id: i64,
    /// Upload timestamp of the parent document
    pub uploaded_at: DateTime<Utc>,
    /// Caller-supplied tags
    pub extra: Metadata,
}

/// A passage of document text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}_chunk_{ordinal}`
    pub id: String,
    /// Parent document identifier
    pub document_id: String,
    /// The passage text
    pub text: String,
    /// Embedding vector, filled in by the store if absent
    pub embedding: Option<Vec<f32>>,
    /// Provenance and caller tags
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Build the chunk id for a document/ordinal pair.
    #[must_use]
    pub fn chunk_id(document_id: &str, ordinal: u32) -> String {
        format!("{document_id}_chunk_{ordinal}")
    }

    /// Flatten provenance fields and caller tags into one metadata map.
    ///
    /// Reserved keys (`doc_id`, `filename`, `chunk_index`, `total_chunks`,
    /// `owner_id`, `uploaded_at`) win over caller tags of the same name. This
    /// flattened view is what filters match against and what search results
    /// carry.
    #[must_use]
    pub fn metadata_map(&self) -> Metadata {
        let mut map = self.metadata.extra.clone();
        map.insert("doc_id".to_string(), self.document_id.as_str().into());
        map.insert("filename".to_string(), self.metadata.filename.as_str().into());
        map.insert(
            "chunk_index".to_string(),
            MetadataValue::Int(i64::from(self.metadata.ordinal)),
        );
        map.insert(
            "total_chunks".to_string(),
            MetadataValue::Int(i64::from(self.metadata.total_chunks)),
        );
        map.insert(
            "owner_id".to_string(),
            MetadataValue::Int(self.metadata.owner_id),
        );
        map.insert(
            "uploaded_at".to_string(),
            self.metadata.uploaded_at.to_rfc3339().into(),
        );
        map
    }
}

// ============================================================================
// Embedding
// ============================================================================

/// Output from embedding a single text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Billed prompt tokens (0 when the provider does not bill)
    pub prompt_tokens: u64,
}

/// Cumulative counters for an embedding provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingStats {
    /// Texts embedded
    pub texts: u64,
    /// Provider calls issued
    pub batches: u64,
    /// Total wall-clock latency across calls
    pub total_latency_ms: u64,
    /// Billed prompt tokens
    pub prompt_tokens: u64,
}

impl EmbeddingStats {
    /// Average latency per provider call in milliseconds.
    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.batches as f64
        }
    }
}

// ============================================================================
// Search
// ============================================================================

/// Backend-native distance metric.
///
/// Input to the per-backend score normalization policy; `Dot` means the
/// backend reports negated inner product as its distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

/// One metadata condition: the value under `key` must be in `accept`.
///
/// A single accepted value is an equality test, several are set membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCondition {
    pub key: String,
    pub accept: Vec<MetadataValue>,
}

/// Filter applied to search results.
///
/// Conditions are AND-combined; a chunk matches only if every condition
/// accepts its flattened metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Minimum normalized score
    pub min_score: Option<f32>,
    /// AND-combined metadata conditions
    pub conditions: Vec<MetadataCondition>,
}

impl SearchFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Require equality on a metadata key.
    #[must_use]
    pub fn with_equals(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.push(MetadataCondition {
            key: key.into(),
            accept: vec![value.into()],
        });
        self
    }

    /// Require set membership on a metadata key.
    #[must_use]
    pub fn with_any(mut self, key: impl Into<String>, accept: Vec<MetadataValue>) -> Self {
        self.conditions.push(MetadataCondition {
            key: key.into(),
            accept,
        });
        self
    }

    /// Whether a normalized score passes the floor.
    #[must_use]
    pub fn accepts_score(&self, score: f32) -> bool {
        self.min_score.is_none_or(|min| score >= min)
    }

    /// Whether flattened chunk metadata satisfies every condition.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions.iter().all(|cond| {
            metadata
                .get(&cond.key)
                .is_some_and(|value| cond.accept.contains(value))
        })
    }
}

/// A matching chunk with its normalized score and 1-based rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk id
    pub chunk_id: String,
    /// Parent document id
    pub document_id: String,
    /// Passage text
    pub content: String,
    /// Normalized similarity score in [0, 1]
    pub score: f32,
    /// 1-based rank; score is non-increasing with rank
    pub rank: u32,
    /// Flattened chunk metadata
    pub metadata: Metadata,
}

// ============================================================================
// Upload
// ============================================================================

/// Outcome of one upload operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document_id: String,
    pub chunk_count: u32,
    pub status: DocumentStatus,
    pub error: Option<String>,
}
