//! Upload pipeline: chunk → embed → store → register.

use chrono::Utc;
use docrag_chunker::OverlapChunker;
use docrag_core::{
    Chunk, ChunkMetadata, DocumentRecord, DocumentStatus, Metadata, UploadReceipt, VectorStore,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::DocumentCatalog;

/// Orchestrates ingestion of one logical document.
///
/// Document ids derive from filename and content, so uploads are idempotent:
/// re-uploading identical content rewrites the same chunk ids instead of
/// duplicating them, which is also the retry path after a failed attempt.
pub struct DocumentIndexer {
    chunker: OverlapChunker,
    store: Arc<dyn VectorStore>,
    catalog: Arc<DocumentCatalog>,
}

impl DocumentIndexer {
    /// Create a new indexer.
    #[must_use]
    pub fn new(
        chunker: OverlapChunker,
        store: Arc<dyn VectorStore>,
        catalog: Arc<DocumentCatalog>,
    ) -> Self {
        Self {
            chunker,
            store,
            catalog,
        }
    }

    /// Compute the content-derived document id.
    #[must_use]
    pub fn document_id(filename: &str, content: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(filename.as_bytes());
        hasher.update(b"\n");
        hasher.update(content.as_bytes());
        hasher.finalize().to_hex()[..16].to_string()
    }

    /// Ingest a document: split, embed, persist, register.
    ///
    /// Every outcome is recorded in the catalog before this returns — empty
    /// content as status `empty` with no store call, a store failure as
    /// status `error` with the underlying message.
    pub async fn upload(
        &self,
        filename: &str,
        content: &str,
        metadata: Metadata,
        owner_id: i64,
    ) -> UploadReceipt {
        let document_id = Self::document_id(filename, content);
        let _guard = self.catalog.lock_id(&document_id).await;

        let uploaded_at = Utc::now();
        let passages = self.chunker.split(content);

        if passages.is_empty() {
            info!(document_id, filename, "upload produced no passages");
            self.catalog
                .register(DocumentRecord {
                    id: document_id.clone(),
                    filename: filename.to_string(),
                    owner_id,
                    uploaded_at,
                    metadata,
                    chunk_count: 0,
                    status: DocumentStatus::Empty,
                    error_message: None,
                })
                .await;
            return UploadReceipt {
                document_id,
                chunk_count: 0,
                status: DocumentStatus::Empty,
                error: None,
            };
        }

        let total_chunks = passages.len() as u32;
        let chunks: Vec<Chunk> = passages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: Chunk::chunk_id(&document_id, i as u32),
                document_id: document_id.clone(),
                text,
                embedding: None,
                metadata: ChunkMetadata {
                    filename: filename.to_string(),
                    ordinal: i as u32,
                    total_chunks,
                    owner_id,
                    uploaded_at,
                    extra: metadata.clone(),
                },
            })
            .collect();

        match self.store.add_chunks(&chunks).await {
            Ok(()) => {
                info!(document_id, filename, chunks = total_chunks, "document indexed");
                self.catalog
                    .register(DocumentRecord {
                        id: document_id.clone(),
                        filename: filename.to_string(),
                        owner_id,
                        uploaded_at,
                        metadata,
                        chunk_count: total_chunks,
                        status: DocumentStatus::Indexed,
                        error_message: None,
                    })
                    .await;
                UploadReceipt {
                    document_id,
                    chunk_count: total_chunks,
                    status: DocumentStatus::Indexed,
                    error: None,
                }
            }
            Err(e) => {
                error!(document_id, filename, error = %e, "upload failed");
                // Record the attempted chunk count so a later remove can
                // still cascade over any partially written ids.
                self.catalog
                    .register(DocumentRecord {
                        id: document_id.clone(),
                        filename: filename.to_string(),
                        owner_id,
                        uploaded_at,
                        metadata,
                        chunk_count: total_chunks,
                        status: DocumentStatus::Error,
                        error_message: Some(e.to_string()),
                    })
                    .await;
                UploadReceipt {
                    document_id,
                    chunk_count: 0,
                    status: DocumentStatus::Error,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
