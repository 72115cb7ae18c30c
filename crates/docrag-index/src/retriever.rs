//! Query orchestration: search, filter, context assembly.

use docrag_core::{MetadataValue, SearchFilter, SearchResult, VectorStore};
use std::sync::Arc;
use tracing::warn;

/// Retrieval defaults.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Default result count for `search`
    pub top_k: usize,
    /// Default score floor for `search` and `get_context`
    pub min_score: f32,
    /// Wider candidate count used by `get_context`
    pub context_top_k: usize,
    /// Rough characters-per-token estimate for the context budget
    pub chars_per_token: usize,
    /// Default token budget for `get_context`
    pub max_context_tokens: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.7,
            context_top_k: 10,
            chars_per_token: 4,
            max_context_tokens: 2000,
        }
    }
}

/// Answers queries against a vector store.
///
/// Retrieval never surfaces store failures to the caller: a broken or
/// unavailable backend degrades to "no results" / "no context", which the
/// consuming layer treats as an answerable state.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    config: RetrieverConfig,
}

impl Retriever {
    /// Create a new retriever.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, config: RetrieverConfig) -> Self {
        Self { store, config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Search for relevant chunks.
    ///
    /// `None` arguments fall back to the configured defaults; `owner_id`
    /// restricts results to one tenant. Store failures return an empty list.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        min_score: Option<f32>,
        owner_id: Option<i64>,
    ) -> Vec<SearchResult> {
        let top_k = top_k.unwrap_or(self.config.top_k);
        let min_score = min_score.unwrap_or(self.config.min_score);
        self.run_search(query, top_k, min_score, owner_id).await
    }

    /// Assemble a bounded context string for a downstream consumer.
    ///
    /// Searches with the wider `context_top_k`, then greedily concatenates
    /// whole passages in rank order while the running length stays within
    /// `max_tokens * chars_per_token` characters. Stops at the first passage
    /// that would overflow; if even the first overflows, returns `""`.
    pub async fn get_context(
        &self,
        query: &str,
        max_tokens: Option<usize>,
        owner_id: Option<i64>,
    ) -> String {
        let max_tokens = max_tokens.unwrap_or(self.config.max_context_tokens);
        let results = self
            .run_search(
                query,
                self.config.context_top_k,
                self.config.min_score,
                owner_id,
            )
            .await;
        assemble_context(&results, max_tokens * self.config.chars_per_token)
    }

    async fn run_search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        owner_id: Option<i64>,
    ) -> Vec<SearchResult> {
        let mut filter = SearchFilter::new().with_min_score(min_score);
        if let Some(owner) = owner_id {
            filter = filter.with_equals("owner_id", owner);
        }

        match self.store.search(query, top_k, Some(&filter)).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "search failed, degrading to no results");
                Vec::new()
            }
        }
    }
}

/// Greedily concatenate whole passages within a character budget.
///
/// Pure logic: results are taken in the given (ranked) order, each rendered
/// with a source prefix, and the first passage that would push the running
/// length past `budget_chars` ends the assembly.
#[must_use]
pub fn assemble_context(results: &[SearchResult], budget_chars: usize) -> String {
    let mut context = String::new();
    let mut used_chars = 0usize;

    for result in results {
        let source = result
            .metadata
            .get("filename")
            .and_then(|v| match v {
                MetadataValue::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or(result.document_id.as_str());

        let block = format!("[Source: {source}]\n{}", result.content);
        let block_chars = block.chars().count();
        let separator_chars = if context.is_empty() { 0 } else { 2 };

        if used_chars + separator_chars + block_chars > budget_chars {
            break;
        }

        if separator_chars > 0 {
            context.push_str("\n\n");
        }
        context.push_str(&block);
        used_chars += separator_chars + block_chars;
    }

    context
}
