//! Integration tests for the full docrag pipeline.
//!
//! Runs the real service against the deterministic hash provider and the
//! in-memory reference store: upload → chunk → embed → store → search →
//! context.

use docrag::{DocumentStatus, MetadataValue, RagConfig, RagService};

fn offline_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embedding.provider = "hash".to_string();
    config.store.backend = "memory".to_string();
    config
}

async fn offline_service() -> RagService {
    let service = RagService::new(&offline_config()).unwrap();
    service.init().await.unwrap();
    service
}

const ML_DOC: &str = "Neural networks are a subset of machine learning algorithms \
    inspired by the structure of the human brain.";
const DB_DOC: &str = "SQL is used for querying relational databases. \
    PostgreSQL and MySQL are popular database systems.";
const AUTH_DOC: &str = "OAuth2 is a popular authentication protocol. \
    JWT tokens are often used for API authentication.";

#[tokio::test]
async fn test_full_pipeline_upload_search_context() {
    let service = offline_service().await;

    let ml = service.upload("ml.txt", ML_DOC, None, 1).await;
    let db = service.upload("database.txt", DB_DOC, None, 1).await;
    let auth = service.upload("security.txt", AUTH_DOC, None, 1).await;

    for receipt in [&ml, &db, &auth] {
        assert_eq!(receipt.status, DocumentStatus::Indexed);
        assert_eq!(receipt.chunk_count, 1);
    }
    assert_eq!(service.chunk_count().await.unwrap(), 3);

    // Identical text embeds identically, so each document is its own best hit.
    let results = service.search(DB_DOC, None, None, None).await;
    assert!(!results.is_empty());
    assert_eq!(results[0].document_id, db.document_id);
    assert!(results[0].score > 0.99, "score was {}", results[0].score);
    assert_eq!(results[0].rank, 1);

    let context = service.get_context(ML_DOC, None, None).await;
    assert!(context.contains("[Source: ml.txt]"));
    assert!(context.contains("Neural networks"));
}

#[tokio::test]
async fn test_search_scores_non_increasing() {
    let service = offline_service().await;
    for i in 0..5 {
        let content = format!("Unique passage number {i} about topic {i}.");
        service
            .upload(&format!("doc{i}.txt"), &content, None, 1)
            .await;
    }

    let results = service
        .search("Unique passage number 2 about topic 2.", Some(5), Some(0.0), None)
        .await;

    assert_eq!(results.len(), 5);
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.rank, (i + 1) as u32);
    }
}

#[tokio::test]
async fn test_unrelated_query_with_high_floor_returns_nothing() {
    let service = offline_service().await;
    service.upload("ml.txt", ML_DOC, None, 1).await;

    let results = service
        .search("completely unrelated gardening question", None, Some(0.99), None)
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_upload_empty_document() {
    let service = offline_service().await;

    let receipt = service.upload("empty.txt", "", None, 1).await;
    assert_eq!(receipt.status, DocumentStatus::Empty);
    assert_eq!(receipt.chunk_count, 0);
    assert_eq!(service.chunk_count().await.unwrap(), 0);

    // The empty upload is still visible in the catalog.
    let documents = service.list_documents(None).await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].status, DocumentStatus::Empty);
}

#[tokio::test]
async fn test_upload_is_idempotent() {
    let service = offline_service().await;

    let first = service.upload("ml.txt", ML_DOC, None, 1).await;
    let count = service.chunk_count().await.unwrap();

    let second = service.upload("ml.txt", ML_DOC, None, 1).await;
    assert_eq!(first.document_id, second.document_id);
    assert_eq!(service.chunk_count().await.unwrap(), count);
    assert_eq!(service.list_documents(None).await.len(), 1);
}

#[tokio::test]
async fn test_delete_document_cascades() {
    let service = offline_service().await;

    let ml = service.upload("ml.txt", ML_DOC, None, 1).await;
    service.upload("database.txt", DB_DOC, None, 1).await;
    assert_eq!(service.chunk_count().await.unwrap(), 2);

    assert!(service.delete_document(&ml.document_id).await);

    let documents = service.list_documents(None).await;
    assert_eq!(documents.len(), 1);
    assert!(documents.iter().all(|d| d.id != ml.document_id));
    assert_eq!(service.chunk_count().await.unwrap(), 1);

    // No surviving search hit may reference the deleted document.
    let deleted_id = MetadataValue::Str(ml.document_id.clone());
    let results = service.search(ML_DOC, Some(10), Some(0.0), None).await;
    assert!(results.iter().all(|r| r.metadata.get("doc_id") != Some(&deleted_id)));
}

#[tokio::test]
async fn test_delete_unknown_document_returns_false() {
    let service = offline_service().await;
    assert!(!service.delete_document("unknown").await);
}

#[tokio::test]
async fn test_owner_scoping() {
    let service = offline_service().await;
    service.upload("a.txt", "shared content one", None, 1).await;
    service.upload("b.txt", "shared content two", None, 2).await;

    let results = service
        .search("shared content one", Some(10), Some(0.0), Some(2))
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].metadata.get("owner_id"),
        Some(&MetadataValue::Int(2))
    );

    assert_eq!(service.list_documents(Some(1)).await.len(), 1);
    assert_eq!(service.list_documents(None).await.len(), 2);
}

#[tokio::test]
async fn test_context_budget_holds() {
    let mut config = offline_config();
    config.retrieval.min_score = 0.0;
    let service = RagService::new(&config).unwrap();
    service.init().await.unwrap();

    for i in 0..6 {
        let content = format!("Passage {i} {}", "filler ".repeat(30));
        service
            .upload(&format!("doc{i}.txt"), &content, None, 1)
            .await;
    }

    let max_tokens = 100;
    let context = service.get_context("Passage", Some(max_tokens), None).await;

    let budget_chars = max_tokens * config.retrieval.chars_per_token;
    assert!(context.chars().count() <= budget_chars);
    // Whole passages only: any included passage appears with its full text.
    if !context.is_empty() {
        assert!(context.contains("[Source: "));
        assert!(context.contains("filler filler"));
    }
}

#[tokio::test]
async fn test_chunk_packing_scenario() {
    let mut config = offline_config();
    config.chunking.chunk_size = 120;
    config.chunking.overlap = 20;
    let service = RagService::new(&config).unwrap();
    service.init().await.unwrap();

    // Three 50-char paragraphs: the first two pack together, the third
    // starts a new passage.
    let content = format!("{}\n\n{}\n\n{}", "a".repeat(50), "b".repeat(50), "c".repeat(50));
    let receipt = service.upload("packed.txt", &content, None, 1).await;

    assert_eq!(receipt.status, DocumentStatus::Indexed);
    assert_eq!(receipt.chunk_count, 2);
}

#[tokio::test]
async fn test_caller_metadata_round_trip() {
    let service = offline_service().await;

    let mut metadata = docrag::Metadata::new();
    metadata.insert("program".to_string(), "strength-12wk".into());

    let receipt = service
        .upload("plan.txt", "progressive overload basics", Some(metadata), 9)
        .await;
    assert_eq!(receipt.status, DocumentStatus::Indexed);

    let results = service
        .search("progressive overload basics", None, None, Some(9))
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].metadata.get("program"),
        Some(&"strength-12wk".into())
    );
}

#[tokio::test]
async fn test_embedding_stats_accumulate() {
    let service = offline_service().await;
    service.upload("ml.txt", ML_DOC, None, 1).await;
    service.search("anything", None, None, None).await;

    let stats = service.embedding_stats().await;
    assert!(stats.texts >= 2, "texts was {}", stats.texts);
    assert!(stats.batches >= 2);
}
