//! # docrag-store
//!
//! Vector store backends for docrag, implementing the
//! [`VectorStore`](docrag_core::VectorStore) trait.
//!
//! ## Backends
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MemoryStore`] | Brute-force in-memory scan; the reference backend and ground truth for filter/score correctness |
//! | [`LanceStore`] | `LanceDB`-backed persistent store with predicate pushdown |
//!
//! Every store is bound to exactly one [`EmbedderPool`](docrag_embed::EmbedderPool):
//! it computes missing chunk embeddings on insert and embeds queries on
//! search, so mixed embedding dimensions can never be persisted.
//!
//! Backend-native distances are converted to normalized `[0, 1]` scores by
//! the [`score`] module; the conversion is an explicit per-metric policy, not
//! a universal formula.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docrag_store::MemoryStore;
//! use docrag_core::VectorStore;
//!
//! let store = MemoryStore::new(pool);
//! store.init().await?;
//! store.add_chunks(&chunks).await?;
//! let results = store.search("protein intake", 5, None).await?;
//! ```

pub mod lance;
pub mod memory;
pub mod schema;
pub mod score;

pub use lance::LanceStore;
pub use memory::MemoryStore;
