//! # docrag-core
//!
//! Core types and traits for the docrag document indexing and retrieval
//! engine.
//!
//! This crate provides the foundational abstractions used throughout docrag:
//!
//! - **Embedding Generation**: [`EmbeddingProvider`] trait for converting text
//!   to vector embeddings
//! - **Vector Storage**: [`VectorStore`] trait for persisting and searching
//!   embeddings with metadata filtering
//!
//! ## Architecture
//!
//! The crate is organized around a pipeline pattern:
//!
//! ```text
//! Text → Chunker → EmbeddingProvider → VectorStore
//!                                          ↓
//!                            query → SearchResult → context
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentRecord`] | Bookkeeping for one uploaded document |
//! | [`Chunk`] | A passage of document text with its embedding |
//! | [`Metadata`] | Flat map of scalar [`MetadataValue`]s |
//! | [`SearchFilter`] | Score floor + AND-combined metadata conditions |
//! | [`SearchResult`] | A matching chunk with normalized score and rank |
//! | [`UploadReceipt`] | Outcome of one upload operation |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`EmbeddingProvider`] | Generate fixed-dimension vector embeddings |
//! | [`VectorStore`] | Store chunks and answer filtered nearest-neighbor queries |
//!
//! ## Related Crates
//!
//! - `docrag-chunker`: deterministic overlapping passage splitter
//! - `docrag-embed`: embedding provider adapters and concurrency pool
//! - `docrag-store`: in-memory and `LanceDB` vector store backends
//! - `docrag-index`: document indexer, retriever, and catalog
//! - `docrag`: service facade, configuration, and CLI

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChunkError, EmbedError, Error, Result, StoreError};
pub use traits::*;
pub use types::*;
