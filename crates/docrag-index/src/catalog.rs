//! Document registry with cascading deletion.

use docrag_core::{Chunk, DocumentRecord, StoreError, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

/// Process-local registry mapping document id → record.
///
/// Mutations of the same document id are serialized through per-id locks
/// ([`DocumentCatalog::lock_id`]); the indexer holds the lock across its
/// store-write + register sequence so an upload and a remove of the same id
/// can never interleave.
pub struct DocumentCatalog {
    records: RwLock<HashMap<String, DocumentRecord>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the per-id lock for a document.
    pub async fn lock_id(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Insert or replace a record.
    pub async fn register(&self, record: DocumentRecord) {
        debug!(id = %record.id, status = record.status.as_str(), "registering document");
        self.records.write().await.insert(record.id.clone(), record);
    }

    /// Look up a record by id.
    pub async fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// List records, optionally restricted to one owner, oldest upload first.
    pub async fn list(&self, owner_id: Option<i64>) -> Vec<DocumentRecord> {
        let records = self.records.read().await;
        let mut listed: Vec<DocumentRecord> = records
            .values()
            .filter(|r| owner_id.is_none_or(|owner| r.owner_id == owner))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        listed
    }

    /// Remove a document and its chunks.
    ///
    /// The store delete runs first; the catalog entry is removed only after it
    /// succeeds. On store failure the entry stays in place so the
    /// inconsistency is visible and the delete retryable. Removing an unknown
    /// id returns `Ok(false)`.
    pub async fn remove(&self, id: &str, store: &dyn VectorStore) -> Result<bool, StoreError> {
        let _guard = self.lock_id(id).await;

        let record = self.records.read().await.get(id).cloned();
        let Some(record) = record else {
            debug!(id, "remove of unknown document");
            return Ok(false);
        };

        let chunk_ids: Vec<String> = (0..record.chunk_count)
            .map(|i| Chunk::chunk_id(id, i))
            .collect();

        if let Err(e) = store.delete(&chunk_ids).await {
            warn!(id, error = %e, "store delete failed, keeping catalog entry");
            return Err(e);
        }

        self.records.write().await.remove(id);
        debug!(id, chunks = chunk_ids.len(), "document removed");
        Ok(true)
    }

    /// Number of registered documents.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the catalog holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for DocumentCatalog {
    fn default() -> Self {
        Self::new()
    }
}
