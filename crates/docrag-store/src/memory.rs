//! In-memory store: the reference backend.
//!
//! [`MemoryStore`] keeps chunks in a map and answers queries with a
//! brute-force cosine scan. It has no external dependency and serves as
//! ground truth for filter and scoring behavior; raw performance is not its
//! contract. Useful for:
//! - tests that need a real store without `LanceDB`
//! - development against small corpora

use async_trait::async_trait;
use docrag_core::{Chunk, SearchFilter, SearchResult, StoreError, VectorStore};
use docrag_embed::EmbedderPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::score::cosine_score;

/// Brute-force in-memory vector store.
pub struct MemoryStore {
    pool: Arc<EmbedderPool>,
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemoryStore {
    /// Create a new in-memory store bound to an embedder pool.
    #[must_use]
    pub fn new(pool: Arc<EmbedderPool>) -> Self {
        Self {
            pool,
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Fill in missing embeddings, batched through the pool.
    async fn embed_missing(&self, chunks: &mut [Chunk]) -> Result<(), StoreError> {
        let missing: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = missing.iter().map(|&i| chunks[i].text.clone()).collect();
        let outputs = self
            .pool
            .embed_batch(&texts)
            .await
            .map_err(|e| StoreError::Insert(format!("embedding failed: {e}")))?;

        for (&i, output) in missing.iter().zip(outputs) {
            chunks[i].embedding = Some(output.embedding);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.pool.dimension()
    }

    async fn init(&self) -> Result<(), StoreError> {
        debug!(dimension = self.dimension(), "MemoryStore initialized");
        Ok(())
    }

    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut chunks = chunks.to_vec();
        self.embed_missing(&mut chunks).await?;

        for chunk in &chunks {
            let len = chunk.embedding.as_ref().map_or(0, Vec::len);
            if len != self.dimension() {
                return Err(StoreError::Insert(format!(
                    "chunk {} has embedding dimension {len}, expected {}",
                    chunk.id,
                    self.dimension()
                )));
            }
        }

        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let query_embedding = self
            .pool
            .embed_query(query)
            .await
            .map_err(|e| StoreError::Query(format!("embedding failed: {e}")))?
            .embedding;

        let chunks = self.chunks.read().await;
        let mut scored: Vec<(f32, &Chunk)> = chunks
            .values()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                let score = cosine_score(&query_embedding, embedding);
                Some((score, chunk))
            })
            .filter(|(score, chunk)| match filter {
                Some(f) => f.accepts_score(*score) && f.matches(&chunk.metadata_map()),
                None => true,
            })
            .collect();

        // Ties break on chunk id so results stay reproducible.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        let results = scored
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(i, (score, chunk))| SearchResult {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                content: chunk.text.clone(),
                score,
                rank: (i + 1) as u32,
                metadata: chunk.metadata_map(),
            })
            .collect();

        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut store = self.chunks.write().await;
        let before = store.len();
        for id in ids {
            store.remove(id);
        }
        debug!(requested = ids.len(), deleted = before - store.len(), "deleted chunks");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.chunks.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.chunks.read().await.len() as u64)
    }
}
