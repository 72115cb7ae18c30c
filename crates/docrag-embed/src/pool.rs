//! Embedder pool: sub-batching, bounded concurrency, cumulative stats.
//!
//! Batches handed to [`EmbedderPool::embed_batch`] are split into bounded
//! sub-batches so a cancelled call never leaves more than one sub-batch in
//! flight. Sub-batches fan out under a semaphore; the default concurrency of
//! 1 keeps provider calls sequential to respect rate limits.

use docrag_core::{EmbedError, EmbeddingOutput, EmbeddingProvider, EmbeddingStats};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{RwLock, Semaphore};
use tracing::debug;

/// Pool wrapping one embedding provider with concurrency control.
pub struct EmbedderPool {
    provider: Arc<dyn EmbeddingProvider>,
    semaphore: Semaphore,
    max_concurrent: usize,
    batch_size: usize,
    stats: RwLock<EmbeddingStats>,
}

impl EmbedderPool {
    /// Create a new pool.
    ///
    /// `max_concurrent` bounds in-flight provider calls (minimum 1);
    /// `batch_size` bounds the texts per provider call (minimum 1).
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_concurrent: usize, batch_size: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            provider,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            batch_size: batch_size.max(1),
            stats: RwLock::new(EmbeddingStats::default()),
        }
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Get the model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Get the underlying provider.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.provider)
    }

    /// Maximum concurrent provider calls.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Snapshot of the cumulative stats.
    pub async fn stats(&self) -> EmbeddingStats {
        self.stats.read().await.clone()
    }

    /// Embed a batch of texts, preserving input order.
    ///
    /// Fails fast: the first sub-batch error aborts the call and is returned
    /// verbatim. Already-completed sub-batches still count toward the stats.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<Vec<String>> = texts.chunks(self.batch_size).map(<[String]>::to_vec).collect();
        let sub_results: Vec<Vec<EmbeddingOutput>> = stream::iter(batches)
            .map(|batch| async move { self.embed_sub_batch(&batch).await })
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        debug!(
            texts = texts.len(),
            sub_batches = sub_results.len(),
            "embedded batch"
        );

        Ok(sub_results.into_iter().flatten().collect())
    }

    /// Embed a single query.
    pub async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Request(format!("semaphore error: {e}")))?;

        let start = Instant::now();
        let output = self.provider.embed_query(query).await?;
        self.record(1, start.elapsed().as_millis() as u64, output.prompt_tokens)
            .await;
        Ok(output)
    }

    async fn embed_sub_batch(&self, batch: &[String]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Request(format!("semaphore error: {e}")))?;

        let start = Instant::now();
        let outputs = self.provider.embed_texts(batch).await?;
        let tokens = outputs.iter().map(|o| o.prompt_tokens).sum();
        self.record(outputs.len() as u64, start.elapsed().as_millis() as u64, tokens)
            .await;
        Ok(outputs)
    }

    async fn record(&self, texts: u64, latency_ms: u64, tokens: u64) {
        let mut stats = self.stats.write().await;
        stats.texts += texts;
        stats.batches += 1;
        stats.total_latency_ms += latency_ms;
        stats.prompt_tokens += tokens;
    }
}
