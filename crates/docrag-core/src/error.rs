//! Error types for docrag.

use thiserror::Error;

/// Main error type for docrag operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Chunking failed
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error, fatal at construction
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Embedding provider errors.
///
/// Configuration variants (`UnknownModel`, `MissingCredentials`) are raised at
/// construction; the rest come from provider calls. Provider failures are
/// always raised before any store write, so a later retry is safe.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure, including timeouts.
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered 2xx but the payload was unusable.
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("delete failed: {0}")]
    Delete(String),
}

/// Result type alias for docrag operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_error_invalid_config_display() {
        let err = ChunkError::InvalidConfig("overlap must be smaller than chunk_size".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: overlap must be smaller than chunk_size"
        );
    }

    #[test]
    fn test_embed_error_unknown_model_display() {
        let err = EmbedError::UnknownModel("text-embedding-9000".to_string());
        assert_eq!(
            err.to_string(),
            "unknown embedding model: text-embedding-9000"
        );
    }

    #[test]
    fn test_embed_error_api_display() {
        let err = EmbedError::Api {
            status: 429,
            body: "rate limit exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 429: rate limit exceeded");
    }

    #[test]
    fn test_embed_error_request_display() {
        let err = EmbedError::Request("connection timed out".to_string());
        assert_eq!(err.to_string(), "request failed: connection timed out");
    }

    #[test]
    fn test_store_error_displays() {
        assert_eq!(
            StoreError::Init("db locked".to_string()).to_string(),
            "store initialization failed: db locked"
        );
        assert_eq!(
            StoreError::Insert("dimension mismatch".to_string()).to_string(),
            "insert failed: dimension mismatch"
        );
        assert_eq!(
            StoreError::Query("bad predicate".to_string()).to_string(),
            "query failed: bad predicate"
        );
        assert_eq!(
            StoreError::Delete("table missing".to_string()).to_string(),
            "delete failed: table missing"
        );
    }

    #[test]
    fn test_error_from_chunk_error() {
        let err: Error = ChunkError::InvalidConfig("zero chunk_size".to_string()).into();
        assert!(matches!(err, Error::Chunking(_)));
        assert!(err.to_string().contains("zero chunk_size"));
    }

    #[test]
    fn test_error_from_embed_error() {
        let err: Error = EmbedError::MissingCredentials("api key".to_string()).into();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.to_string().contains("api key"));
    }

    #[test]
    fn test_error_from_store_error() {
        let err: Error = StoreError::Query("timeout".to_string()).into();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_config_display() {
        let err = Error::Config("unknown store backend: redis".to_string());
        assert_eq!(err.to_string(), "config error: unknown store backend: redis");
    }

    #[test]
    fn test_result_type_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(7)
        }

        fn err_fn() -> Result<i32> {
            Err(Error::Other("boom".to_string()))
        }

        assert!(ok_fn().is_ok());
        assert!(err_fn().is_err());
    }
}
