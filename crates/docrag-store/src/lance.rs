//! `LanceDB` implementation of `VectorStore`.

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{Array, ArrayRef, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use async_trait::async_trait;
use docrag_core::{
    metadata_from_json, metadata_to_json, Chunk, DistanceMetric, Metadata, MetadataCondition,
    MetadataValue, SearchFilter, SearchResult, StoreError, VectorStore,
};
use docrag_embed::EmbedderPool;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::schema::{chunks_schema, CHUNKS_TABLE};
use crate::score;

/// Columns that double as metadata keys and can be pushed down as SQL
/// predicates.
const PUSHDOWN_COLUMNS: &[&str] = &["doc_id", "filename", "owner_id"];

/// How many extra candidates to fetch when part of the filter must be applied
/// post-query.
const POST_FILTER_FETCH_FACTOR: usize = 4;

/// LanceDB-backed vector store.
///
/// Connection and table handles are opened lazily on first use. Writes may be
/// eventually consistent with respect to the next search.
pub struct LanceStore {
    db_path: PathBuf,
    metric: DistanceMetric,
    pool: Arc<EmbedderPool>,
    connection: RwLock<Option<Connection>>,
    table: RwLock<Option<Table>>,
}

impl LanceStore {
    /// Create a new `LanceStore` bound to an embedder pool.
    #[must_use]
    pub fn new(db_path: PathBuf, pool: Arc<EmbedderPool>, metric: DistanceMetric) -> Self {
        Self {
            db_path,
            metric,
            pool,
            connection: RwLock::new(None),
            table: RwLock::new(None),
        }
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the configured distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get or create the connection.
    async fn get_connection(&self) -> Result<Connection, StoreError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let mut conn = self.connection.write().await;
        if conn.is_none() {
            let db_path_str = self.db_path.to_string_lossy().to_string();
            let new_conn = connect(&db_path_str)
                .execute()
                .await
                .map_err(|e| StoreError::Init(format!("failed to connect to LanceDB: {e}")))?;
            *conn = Some(new_conn);
        }
        Ok(conn.as_ref().cloned().ok_or_else(|| {
            StoreError::Init("connection vanished during initialization".to_string())
        })?)
    }

    /// Get or open the chunks table.
    async fn get_table(&self) -> Result<Table, StoreError> {
        {
            let table = self.table.read().await;
            if let Some(ref t) = *table {
                return Ok(t.clone());
            }
        }

        let conn = self.get_connection().await?;
        let mut table_lock = self.table.write().await;

        if table_lock.is_none() {
            let t = conn
                .open_table(CHUNKS_TABLE)
                .execute()
                .await
                .map_err(|e| StoreError::Init(format!("failed to open chunks table: {e}")))?;
            *table_lock = Some(t);
        }

        Ok(table_lock.as_ref().cloned().ok_or_else(|| {
            StoreError::Init("table handle vanished during initialization".to_string())
        })?)
    }

    /// Create the chunks table if it does not exist yet.
    async fn ensure_table(&self, conn: &Connection) -> Result<(), StoreError> {
        let tables = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("failed to list tables: {e}")))?;

        if !tables.contains(&CHUNKS_TABLE.to_string()) {
            info!("creating chunks table");
            let schema = Arc::new(chunks_schema(self.dimension()));
            conn.create_empty_table(CHUNKS_TABLE, schema)
                .execute()
                .await
                .map_err(|e| StoreError::Init(format!("failed to create chunks table: {e}")))?;
        }
        Ok(())
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

    /// Convert chunks to an Arrow `RecordBatch`.
    fn chunks_to_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch, StoreError> {
        let ids: Vec<_> = chunks.iter().map(|c| c.id.clone()).collect();
        let doc_ids: Vec<_> = chunks.iter().map(|c| c.document_id.clone()).collect();
        let filenames: Vec<_> = chunks.iter().map(|c| c.metadata.filename.clone()).collect();
        let owner_ids: Vec<_> = chunks.iter().map(|c| c.metadata.owner_id).collect();
        let chunk_indices: Vec<_> = chunks.iter().map(|c| c.metadata.ordinal).collect();
        let total_chunks: Vec<_> = chunks.iter().map(|c| c.metadata.total_chunks).collect();
        let uploaded_ats: Vec<_> = chunks
            .iter()
            .map(|c| c.metadata.uploaded_at.to_rfc3339())
            .collect();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.clone()).collect();
        let metadata_json: Vec<_> = chunks
            .iter()
            .map(|c| metadata_to_json(&c.metadata.extra).to_string())
            .collect();

        let schema = Arc::new(chunks_schema(self.dimension()));
        let vector_array = build_vector_array(chunks, self.dimension())?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(doc_ids)),
                Arc::new(StringArray::from(filenames)),
                Arc::new(Int64Array::from(owner_ids)),
                Arc::new(UInt32Array::from(chunk_indices)),
                Arc::new(UInt32Array::from(total_chunks)),
                Arc::new(StringArray::from(uploaded_ats)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(metadata_json)),
                vector_array,
            ],
        )
        .map_err(|e| StoreError::Insert(format!("failed to create RecordBatch: {e}")))
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    fn dimension(&self) -> usize {
        self.pool.dimension()
    }

    async fn init(&self) -> Result<(), StoreError> {
        info!(path = %self.db_path.display(), "initializing LanceDB");

        if let Some(parent) = self.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Init(format!("failed to create db directory: {e}")))?;
        }

        let conn = self.get_connection().await?;
        self.ensure_table(&conn).await?;
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

        let table = self.get_table().await?;

        // Idempotence by id: replace any previous rows for these ids.
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        table
            .delete(&id_predicate(&ids))
            .await
            .map_err(|e| StoreError::Insert(format!("failed to replace existing chunks: {e}")))?;

        let batch = self.chunks_to_batch(&chunks)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| StoreError::Insert(format!("failed to insert chunks: {e}")))?;

        debug!(count = chunks.len(), "inserted chunks");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let embedding = self
            .pool
            .embed_query(query)
            .await
            .map_err(|e| StoreError::Query(format!("embedding failed: {e}")))?
            .embedding;

        let table = self.get_table().await?;

        let (predicates, leftover) = split_filter(filter);
        let needs_post_filter =
            !leftover.is_empty() || filter.is_some_and(|f| f.min_score.is_some());
        let fetch = if needs_post_filter {
            top_k.saturating_mul(POST_FILTER_FETCH_FACTOR)
        } else {
            top_k
        };

        let mut query_builder = table
            .vector_search(embedding)
            .map_err(|e| StoreError::Query(format!("failed to create search query: {e}")))?
            .distance_type(metric_to_lance(self.metric))
            .limit(fetch);

        if !predicates.is_empty() {
            query_builder = query_builder.only_if(predicates.join(" AND "));
        }

        let mut stream = query_builder
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("failed to execute search: {e}")))?;

        let mut rows = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("failed to fetch results: {e}")))?
        {
            rows.extend(batch_to_rows(&batch, self.metric)?);
        }

        let post_filter = SearchFilter {
            min_score: filter.and_then(|f| f.min_score),
            conditions: leftover,
        };

        let results = rows
            .into_iter()
            .filter(|row| {
                post_filter.accepts_score(row.score) && post_filter.matches(&row.metadata)
            })
            .take(top_k)
            .enumerate()
            .map(|(i, row)| SearchResult {
                chunk_id: row.chunk_id,
                document_id: row.document_id,
                content: row.content,
                score: row.score,
                rank: (i + 1) as u32,
                metadata: row.metadata,
            })
            .collect();

        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let table = self.get_table().await?;
        table
            .delete(&id_predicate(ids))
            .await
            .map_err(|e| StoreError::Delete(format!("failed to delete chunks: {e}")))?;

        debug!(count = ids.len(), "deleted chunks");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let conn = self.get_connection().await?;

        if let Err(e) = conn.drop_table(CHUNKS_TABLE, &[]).await {
            warn!("drop_table failed (table may not exist): {e}");
        }
        {
            let mut table = self.table.write().await;
            *table = None;
        }

        self.ensure_table(&conn).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let table = self.get_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("failed to count rows: {e}")))?;
        Ok(count as u64)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// One decoded result row before filtering and ranking.
struct Row {
    chunk_id: String,
    document_id: String,
    content: String,
    score: f32,
    metadata: Metadata,
}

fn metric_to_lance(metric: DistanceMetric) -> DistanceType {
    match metric {
        DistanceMetric::Cosine => DistanceType::Cosine,
        DistanceMetric::L2 => DistanceType::L2,
        DistanceMetric::Dot => DistanceType::Dot,
    }
}

/// Build an `id IN (...)` predicate with escaped string literals.
fn id_predicate(ids: &[String]) -> String {
    let list = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("id IN ({list})")
}

/// Render a metadata value as a SQL literal, if the column type allows it.
fn sql_literal(value: &MetadataValue) -> Option<String> {
    match value {
        MetadataValue::Str(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        MetadataValue::Int(i) => Some(i.to_string()),
        MetadataValue::Bool(_) | MetadataValue::Float(_) | MetadataValue::Null => None,
    }
}

/// Split filter conditions into pushed-down SQL predicates and conditions that
/// must be applied post-query.
fn split_filter(filter: Option<&SearchFilter>) -> (Vec<String>, Vec<MetadataCondition>) {
    let mut predicates = Vec::new();
    let mut leftover = Vec::new();

    let Some(filter) = filter else {
        return (predicates, leftover);
    };

    for condition in &filter.conditions {
        if !PUSHDOWN_COLUMNS.contains(&condition.key.as_str()) || condition.accept.is_empty() {
            leftover.push(condition.clone());
            continue;
        }

        let literals: Option<Vec<String>> = condition.accept.iter().map(sql_literal).collect();
        match literals {
            Some(literals) if literals.len() == 1 => {
                predicates.push(format!("{} = {}", condition.key, literals[0]));
            }
            Some(literals) => {
                predicates.push(format!("{} IN ({})", condition.key, literals.join(", ")));
            }
            None => leftover.push(condition.clone()),
        }
    }

    (predicates, leftover)
}

fn batch_to_rows(batch: &RecordBatch, metric: DistanceMetric) -> Result<Vec<Row>, StoreError> {
    let ids = string_column(batch, "id")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let filenames = string_column(batch, "filename")?;
    let owner_ids = batch
        .column_by_name("owner_id")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| StoreError::Query("missing owner_id column".to_string()))?;
    let chunk_indices = uint32_column(batch, "chunk_index")?;
    let total_chunks = uint32_column(batch, "total_chunks")?;
    let uploaded_ats = string_column(batch, "uploaded_at")?;
    let texts = string_column(batch, "text")?;
    let metadata_json = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let extra_json: serde_json::Value =
            serde_json::from_str(metadata_json.value(i)).unwrap_or(serde_json::Value::Null);
        let mut metadata = metadata_from_json(&extra_json);

        metadata.insert("doc_id".to_string(), doc_ids.value(i).into());
        metadata.insert("filename".to_string(), filenames.value(i).into());
        metadata.insert(
            "chunk_index".to_string(),
            MetadataValue::Int(i64::from(chunk_indices.value(i))),
        );
        metadata.insert(
            "total_chunks".to_string(),
            MetadataValue::Int(i64::from(total_chunks.value(i))),
        );
        metadata.insert(
            "owner_id".to_string(),
            MetadataValue::Int(owner_ids.value(i)),
        );
        metadata.insert("uploaded_at".to_string(), uploaded_ats.value(i).into());

        let score = distances.map_or(0.0, |d| score::normalize(metric, d.value(i)));

        rows.push(Row {
            chunk_id: ids.value(i).to_string(),
            document_id: doc_ids.value(i).to_string(),
            content: texts.value(i).to_string(),
            score,
            metadata,
        });
    }

    Ok(rows)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Query(format!("missing {name} column")))
}

fn uint32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| StoreError::Query(format!("missing {name} column")))
}

fn build_vector_array(chunks: &[Chunk], dim: usize) -> Result<ArrayRef, StoreError> {
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), dim as i32);

    for chunk in chunks {
        let embedding = chunk.embedding.as_ref().ok_or_else(|| {
            StoreError::Insert(format!("chunk {} has no embedding", chunk.id))
        })?;
        let values_builder = builder.values();
        for &v in embedding {
            values_builder.append_value(v);
        }
        builder.append(true);
    }

    Ok(Arc::new(builder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docrag_core::ChunkMetadata;
    use docrag_embed::HashEmbedder;
    use tempfile::tempdir;

    fn test_pool() -> Arc<EmbedderPool> {
        Arc::new(EmbedderPool::new(Arc::new(HashEmbedder::new()), 1, 16))
    }

    fn test_store(dir: &Path) -> LanceStore {
        LanceStore::new(dir.join("test.lance"), test_pool(), DistanceMetric::Cosine)
    }

    fn make_chunk(doc_id: &str, ordinal: u32, text: &str, owner_id: i64) -> Chunk {
        Chunk {
            id: Chunk::chunk_id(doc_id, ordinal),
            document_id: doc_id.to_string(),
            text: text.to_string(),
            embedding: None,
            metadata: ChunkMetadata {
                filename: format!("{doc_id}.txt"),
                ordinal,
                total_chunks: 1,
                owner_id,
                uploaded_at: Utc::now(),
                extra: Metadata::new(),
            },
        }
    }

    #[test]
    fn test_id_predicate_escapes_quotes() {
        let ids = vec!["a'b".to_string(), "c".to_string()];
        assert_eq!(id_predicate(&ids), "id IN ('a''b', 'c')");
    }

    #[test]
    fn test_split_filter_pushdown_and_leftover() {
        let filter = SearchFilter::new()
            .with_equals("owner_id", 7i64)
            .with_any("doc_id", vec!["a".into(), "b".into()])
            .with_equals("topic", "fitness");

        let (predicates, leftover) = split_filter(Some(&filter));
        assert_eq!(predicates, vec!["owner_id = 7", "doc_id IN ('a', 'b')"]);
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].key, "topic");
    }

    #[test]
    fn test_split_filter_none() {
        let (predicates, leftover) = split_filter(None);
        assert!(predicates.is_empty());
        assert!(leftover.is_empty());
    }

    #[tokio::test]
    async fn test_init_idempotent() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_search_round_trip() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        store
            .add_chunks(&[
                make_chunk("doc1", 0, "protein intake after workouts", 1),
                make_chunk("doc2", 0, "calendar integration setup", 1),
            ])
            .await
            .unwrap();

        let results = store
            .search("protein intake after workouts", 1, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "doc1_chunk_0");
        assert!(results[0].score > 0.99, "score was {}", results[0].score);
    }

    #[tokio::test]
    async fn test_add_is_idempotent_by_id() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        let chunks = vec![make_chunk("doc1", 0, "alpha", 1)];
        store.add_chunks(&chunks).await.unwrap();
        store.add_chunks(&chunks).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_owner_filter_pushdown() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        store
            .add_chunks(&[
                make_chunk("doc1", 0, "shared topic text", 1),
                make_chunk("doc2", 0, "shared topic text variant", 2),
            ])
            .await
            .unwrap();

        let filter = SearchFilter::new().with_equals("owner_id", 2i64);
        let results = store.search("shared topic", 5, Some(&filter)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "doc2");
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        store
            .add_chunks(&[make_chunk("doc1", 0, "alpha", 1)])
            .await
            .unwrap();

        store.delete(&["ghost_chunk_0".to_string()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&["doc1_chunk_0".to_string()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_recreates_empty_table() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        store
            .add_chunks(&[make_chunk("doc1", 0, "alpha", 1)])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_caller_metadata_survives_round_trip() {
        let temp = tempdir().unwrap();
        let store = test_store(temp.path());
        store.init().await.unwrap();

        let mut chunk = make_chunk("doc1", 0, "tagged passage", 1);
        chunk.metadata.extra.insert("topic".to_string(), "fitness".into());
        store.add_chunks(&[chunk]).await.unwrap();

        let results = store.search("tagged passage", 1, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].metadata.get("topic"),
            Some(&MetadataValue::Str("fitness".to_string()))
        );
        assert_eq!(results[0].metadata.get("owner_id"), Some(&MetadataValue::Int(1)));
    }
}
