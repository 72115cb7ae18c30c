//! Service facade wiring the pipeline together.
//!
//! [`RagService`] is the single object the hosting layer holds: constructed
//! once at startup from a [`RagConfig`], initialized explicitly, passed by
//! reference. No module-level state, no lazily materialized singletons.

use docrag_chunker::{ChunkConfig, OverlapChunker};
use docrag_core::{
    DocumentRecord, EmbeddingProvider, EmbeddingStats, Error, Metadata, Result, SearchResult,
    UploadReceipt, VectorStore,
};
use docrag_embed::{EmbedderPool, HashEmbedder, OpenAiConfig, OpenAiEmbedder};
use docrag_index::{DocumentCatalog, DocumentIndexer, Retriever, RetrieverConfig};
use docrag_store::{LanceStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{EmbeddingSettings, RagConfig, StoreSettings};

/// The docrag service: upload, search, context assembly, lifecycle.
pub struct RagService {
    pool: Arc<EmbedderPool>,
    store: Arc<dyn VectorStore>,
    catalog: Arc<DocumentCatalog>,
    indexer: DocumentIndexer,
    retriever: Retriever,
}

impl RagService {
    /// Construct the service from configuration.
    ///
    /// Fails fast on configuration problems — unknown provider or backend
    /// keys, unknown models, missing credentials, invalid chunking — so a
    /// partially configured service never starts.
    pub fn new(config: &RagConfig) -> Result<Self> {
        let chunk_config = ChunkConfig::new(config.chunking.chunk_size, config.chunking.overlap)?;
        let chunker = OverlapChunker::new(chunk_config);

        let provider = build_provider(&config.embedding)?;
        let pool = Arc::new(EmbedderPool::new(
            provider,
            config.embedding.max_concurrent,
            config.embedding.batch_size,
        ));

        let store = build_store(&config.store, Arc::clone(&pool))?;
        let catalog = Arc::new(DocumentCatalog::new());

        let indexer = DocumentIndexer::new(chunker, Arc::clone(&store), Arc::clone(&catalog));
        let retriever = Retriever::new(
            Arc::clone(&store),
            RetrieverConfig {
                top_k: config.retrieval.top_k,
                min_score: config.retrieval.min_score,
                context_top_k: config.retrieval.context_top_k,
                chars_per_token: config.retrieval.chars_per_token,
                max_context_tokens: config.retrieval.max_context_tokens,
            },
        );

        info!(
            provider = %config.embedding.provider,
            backend = %config.store.backend,
            "service constructed"
        );

        Ok(Self {
            pool,
            store,
            catalog,
            indexer,
            retriever,
        })
    }

    /// Open the store. Call once before serving.
    pub async fn init(&self) -> Result<()> {
        self.store.init().await?;
        Ok(())
    }

    /// Ingest a document.
    pub async fn upload(
        &self,
        filename: &str,
        content: &str,
        metadata: Option<Metadata>,
        owner_id: i64,
    ) -> UploadReceipt {
        self.indexer
            .upload(filename, content, metadata.unwrap_or_default(), owner_id)
            .await
    }

    /// Search for relevant chunks. Store failures degrade to an empty list.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        min_score: Option<f32>,
        owner_id: Option<i64>,
    ) -> Vec<SearchResult> {
        self.retriever.search(query, top_k, min_score, owner_id).await
    }

    /// Assemble a bounded context string for a downstream consumer.
    pub async fn get_context(
        &self,
        query: &str,
        max_tokens: Option<usize>,
        owner_id: Option<i64>,
    ) -> String {
        self.retriever.get_context(query, max_tokens, owner_id).await
    }

    /// List uploaded documents, optionally for one owner.
    pub async fn list_documents(&self, owner_id: Option<i64>) -> Vec<DocumentRecord> {
        self.catalog.list(owner_id).await
    }

    /// Delete a document and its chunks.
    ///
    /// Returns `false` both for an unknown id and for a failed store delete;
    /// in the latter case the catalog entry stays visible so the delete can
    /// be retried.
    pub async fn delete_document(&self, id: &str) -> bool {
        match self.catalog.remove(id, self.store.as_ref()).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(id, error = %e, "delete failed");
                false
            }
        }
    }

    /// Number of chunks currently persisted.
    pub async fn chunk_count(&self) -> Result<u64> {
        Ok(self.store.count().await?)
    }

    /// Cumulative embedding stats for this service instance.
    pub async fn embedding_stats(&self) -> EmbeddingStats {
        self.pool.stats().await
    }
}

/// Build the embedding provider named by the configuration.
fn build_provider(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "openai" => {
            let embedder = OpenAiEmbedder::new(OpenAiConfig {
                api_key: settings.api_key.clone().unwrap_or_default(),
                model: settings.model.clone(),
                base_url: settings.base_url.clone(),
                timeout: Duration::from_secs(settings.timeout_secs),
            })?;
            Ok(Arc::new(embedder))
        }
        "hash" => Ok(Arc::new(HashEmbedder::new())),
        other => Err(Error::Config(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

/// Build the vector store named by the configuration.
fn build_store(settings: &StoreSettings, pool: Arc<EmbedderPool>) -> Result<Arc<dyn VectorStore>> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new(pool))),
        "lancedb" => Ok(Arc::new(LanceStore::new(
            settings.db_path.clone(),
            pool,
            settings.metric,
        ))),
        other => Err(Error::Config(format!("unknown store backend: {other}"))),
    }
}
