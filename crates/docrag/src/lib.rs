//! # docrag
//!
//! Document indexing and retrieval engine for retrieval-augmented generation.
//!
//! docrag ingests free-form text, splits it into overlapping passages, embeds
//! the passages through a pluggable provider, persists the vectors through a
//! pluggable backend, and assembles bounded context strings for a downstream
//! consumer. This crate is the facade: it wires the component crates together
//! behind [`RagService`] and a configuration-keyed factory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag::{RagConfig, RagService};
//!
//! let config = RagConfig::load(None)?;
//! let service = RagService::new(&config)?;
//! service.init().await?;
//!
//! let receipt = service.upload("notes.txt", &content, None, 42).await;
//! let hits = service.search("training plan", None, None, Some(42)).await;
//! let context = service.get_context("training plan", Some(2000), Some(42)).await;
//! ```
//!
//! ## Component crates
//!
//! - `docrag-core`: shared types, traits, error taxonomy
//! - `docrag-chunker`: deterministic overlapping passage splitter
//! - `docrag-embed`: embedding provider adapters and concurrency pool
//! - `docrag-store`: in-memory and `LanceDB` vector store backends
//! - `docrag-index`: document indexer, retriever, and catalog

pub mod config;
pub mod service;

pub use config::RagConfig;
pub use service::RagService;

pub use docrag_core::{
    DocumentRecord, DocumentStatus, Error, Metadata, MetadataValue, Result, SearchResult,
    UploadReceipt,
};
