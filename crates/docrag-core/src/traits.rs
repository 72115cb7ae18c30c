//! Core traits for docrag components.
//!
//! This module defines the trait interfaces behind the pluggable seams:
//!
//! - [`EmbeddingProvider`]: turn text into fixed-dimension vectors
//! - [`VectorStore`]: persist chunks and answer filtered nearest-neighbor
//!   queries
//!
//! Implementations are selected through a configuration-keyed factory in the
//! facade crate, never via runtime type inspection.

use async_trait::async_trait;

use crate::error::{EmbedError, StoreError};
use crate::types::{Chunk, EmbeddingOutput, SearchFilter, SearchResult};

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
///
/// Each adapter declares a fixed dimension per model; construction fails for
/// an unknown model. Failures surface as typed [`EmbedError`]s, never as a
/// silent zero-vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, preserving input order.
    ///
    /// Adapters with a native batch endpoint issue one call for the whole
    /// slice; others loop. Batch-size limits and concurrency live in the
    /// embedder pool, not here.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a single query string.
    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let outputs = self.embed_texts(&[query.to_string()]).await?;
        outputs
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Response("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Trait for vector storage and search.
///
/// A store instance is bound to exactly one embedding provider: it computes
/// missing chunk embeddings on insert and embeds queries on search, so mixed
/// dimensions can never be persisted.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embedding dimension of the bound provider.
    fn dimension(&self) -> usize;

    /// Initialize the store (open connections, create tables).
    async fn init(&self) -> Result<(), StoreError>;

    /// Insert chunks, computing any missing embeddings first.
    ///
    /// Idempotent by chunk id: re-adding overwrites, never duplicates.
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Embed the query and return the best-matching chunks.
    ///
    /// Scores are normalized to [0, 1]; results are ordered by non-increasing
    /// score with 1-based ranks. Filter conditions the backend cannot push
    /// down are applied post-query.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>, StoreError>;

    /// Delete chunks by id. Missing ids are a no-op.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Drop all entries and recreate the collection.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<u64, StoreError>;
}
