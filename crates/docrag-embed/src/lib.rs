//! # docrag-embed
//!
//! Embedding provider adapters for docrag.
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OpenAiEmbedder`] | Remote HTTP adapter with a native batch endpoint |
//! | [`HashEmbedder`] | Deterministic offline provider for tests and development |
//! | [`EmbedderPool`] | Sub-batching, bounded concurrency, and cumulative stats |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag_embed::{EmbedderPool, OpenAiConfig, OpenAiEmbedder};
//! use std::sync::Arc;
//!
//! let embedder = OpenAiEmbedder::new(OpenAiConfig {
//!     api_key: std::env::var("DOCRAG_OPENAI_API_KEY")?,
//!     model: "text-embedding-3-small".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // Wrap with a pool: sub-batches of 64, at most 2 requests in flight
//! let pool = EmbedderPool::new(Arc::new(embedder), 2, 64);
//! let embeddings = pool.embed_batch(&texts).await?;
//! ```
//!
//! Provider failures surface as typed [`docrag_core::EmbedError`]s — never a
//! silent zero-vector. The pool fails fast: the first sub-batch error aborts
//! the whole call.

pub mod hash;
pub mod openai;
pub mod pool;

pub use hash::HashEmbedder;
pub use openai::{OpenAiConfig, OpenAiEmbedder};
pub use pool::EmbedderPool;
