//! # docrag-index
//!
//! Document lifecycle orchestration for docrag.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentIndexer`] | chunk → embed → store pipeline for one upload |
//! | [`Retriever`] | query → search → filter → context assembly |
//! | [`DocumentCatalog`] | document registry with cascading deletion |
//!
//! The indexer and catalog serialize concurrent operations on the same
//! document id through per-id locks; operations on different ids proceed
//! independently. Retrieval failures degrade to empty results by design —
//! the consuming layer has its own fallback — while upload failures are
//! reported loudly and remain retryable by re-uploading the same content.

pub mod catalog;
pub mod indexer;
pub mod retriever;

pub use catalog::DocumentCatalog;
pub use indexer::DocumentIndexer;
pub use retriever::{Retriever, RetrieverConfig};
