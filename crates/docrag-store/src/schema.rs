//! Arrow schema definition for the `LanceDB` chunks table.

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Name of the chunks table.
pub const CHUNKS_TABLE: &str = "chunks";

/// Schema for the chunks table.
///
/// Caller metadata lives in a JSON-encoded `metadata` column; the provenance
/// fields every chunk carries get real columns so predicates can be pushed
/// down to the backend.
#[must_use]
pub fn chunks_schema(embedding_dim: usize) -> Schema {
    Schema::new(vec![
        // Identity
        Field::new("id", DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        // Provenance
        Field::new("filename", DataType::Utf8, false),
        Field::new("owner_id", DataType::Int64, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("total_chunks", DataType::UInt32, false),
        Field::new("uploaded_at", DataType::Utf8, false),
        // Content
        Field::new("text", DataType::Utf8, false),
        // Caller tags, JSON-encoded
        Field::new("metadata", DataType::Utf8, false),
        // Embedding
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim as i32,
            ),
            false,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_schema_fields() {
        let schema = chunks_schema(384);
        assert_eq!(schema.fields().len(), 10);
        assert!(schema.field_with_name("id").is_ok());
        assert!(schema.field_with_name("vector").is_ok());

        match schema.field_with_name("vector").unwrap().data_type() {
            DataType::FixedSizeList(_, dim) => assert_eq!(*dim, 384),
            other => panic!("unexpected vector type {other:?}"),
        }
    }
}
