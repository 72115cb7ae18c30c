//! # docrag CLI
//!
//! Command-line interface for the docrag indexing and retrieval engine.
//!
//! ## Commands
//!
//! - `docrag upload <FILE>` - Chunk, embed, and store a document
//! - `docrag search <QUERY>` - Search stored chunks
//! - `docrag context <QUERY>` - Assemble a bounded context string
//! - `docrag list` - List documents uploaded by this process
//! - `docrag delete <ID>` - Delete a document and its chunks
//!
//! ## Examples
//!
//! ```bash
//! # Use the offline provider and in-memory store
//! DOCRAG_EMBEDDING_PROVIDER=hash DOCRAG_STORE_BACKEND=memory \
//!     docrag upload notes.txt --owner 1
//!
//! # Search with JSON output
//! docrag search "training plan" --format json
//! ```
//!
//! The document registry is process-local; `list` and `delete` see documents
//! uploaded in the same invocation.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use docrag::{RagConfig, RagService};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Document indexing and retrieval for RAG pipelines")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and store a document
    Upload {
        /// File to ingest
        file: PathBuf,

        /// Owner id the document belongs to
        #[arg(long, default_value_t = 0)]
        owner: i64,
    },

    /// Search stored chunks
    Search {
        /// Query text
        query: String,

        /// Number of results
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum normalized score
        #[arg(long)]
        min_score: Option<f32>,

        /// Restrict to one owner
        #[arg(long)]
        owner: Option<i64>,
    },

    /// Assemble a bounded context string
    Context {
        /// Query text
        query: String,

        /// Token budget for the context
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Restrict to one owner
        #[arg(long)]
        owner: Option<i64>,
    },

    /// List documents uploaded by this process
    List {
        /// Restrict to one owner
        #[arg(long)]
        owner: Option<i64>,
    },

    /// Delete a document and its chunks
    Delete {
        /// Document id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RagConfig::load(cli.config.as_deref())?;
    let service = RagService::new(&config)?;
    service.init().await?;

    match cli.command {
        Commands::Upload { file, owner } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let receipt = service.upload(&filename, &content, None, owner).await;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
                OutputFormat::Text => {
                    println!(
                        "{} {} ({} chunks){}",
                        receipt.status.as_str(),
                        receipt.document_id,
                        receipt.chunk_count,
                        receipt
                            .error
                            .map(|e| format!(": {e}"))
                            .unwrap_or_default()
                    );
                }
            }
        }

        Commands::Search {
            query,
            top_k,
            min_score,
            owner,
        } => {
            let results = service.search(&query, top_k, min_score, owner).await;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Text => {
                    if results.is_empty() {
                        println!("no results");
                    }
                    for result in results {
                        println!(
                            "{:>2}. [{:.3}] {} — {}",
                            result.rank,
                            result.score,
                            result.chunk_id,
                            first_line(&result.content)
                        );
                    }
                }
            }
        }

        Commands::Context {
            query,
            max_tokens,
            owner,
        } => {
            let context = service.get_context(&query, max_tokens, owner).await;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&context)?);
                }
                OutputFormat::Text => println!("{context}"),
            }
        }

        Commands::List { owner } => {
            let documents = service.list_documents(owner).await;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&documents)?),
                OutputFormat::Text => {
                    if documents.is_empty() {
                        println!("no documents");
                    }
                    for doc in documents {
                        println!(
                            "{}  {}  owner={}  chunks={}  {}",
                            doc.id,
                            doc.filename,
                            doc.owner_id,
                            doc.chunk_count,
                            doc.status.as_str()
                        );
                    }
                }
            }
        }

        Commands::Delete { id } => {
            let removed = service.delete_document(&id).await;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&removed)?),
                OutputFormat::Text => {
                    println!("{}", if removed { "deleted" } else { "not found" });
                }
            }
        }
    }

    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
