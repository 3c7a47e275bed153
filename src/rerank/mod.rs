//! Reranking of retrieved passages.
//!
//! A reranker is an optional quality step: the retriever calls it after
//! score filtering and keeps the vector ordering if it fails.

mod api;

pub use api::{ApiReranker, RerankApi};

use crate::config::{ProviderSettings, RerankerSettings};
use crate::error::{LexragError, Result};
use crate::rag::{RerankedChunk, RetrievedChunk};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for rerankers.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reorder `documents` by relevance to `query`, returning at most `top_n`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[RetrievedChunk],
        top_n: usize,
    ) -> Result<Vec<RerankedChunk>>;
}

/// Create the reranker named by `settings.provider`.
///
/// Returns `None` for the `none` provider so that "no reranker" is an
/// explicit branch rather than a stub implementation.
pub fn create_reranker(
    settings: &RerankerSettings,
    providers: &ProviderSettings,
) -> Result<Option<Arc<dyn Reranker>>> {
    let api = match settings.provider.to_lowercase().as_str() {
        "none" | "" => return Ok(None),
        "together" | "together_ai" => RerankApi::Together,
        "cohere" => RerankApi::Cohere,
        other => {
            return Err(LexragError::Config(format!("Unknown reranker provider: {}", other)))
        }
    };

    Ok(Some(Arc::new(ApiReranker::new(api, &settings.model, providers)?)))
}

/// Pair rerank results (original index, score) with their documents.
///
/// Out-of-range indices are skipped and each document is used at most once.
pub(crate) fn apply_rerank_results(
    documents: &[RetrievedChunk],
    results: impl IntoIterator<Item = (usize, f32)>,
    top_n: usize,
) -> Vec<RerankedChunk> {
    let mut seen = vec![false; documents.len()];
    let mut reranked = Vec::new();

    for (index, rerank_score) in results {
        if reranked.len() >= top_n {
            break;
        }
        match seen.get_mut(index) {
            Some(used) if !*used => {
                *used = true;
                reranked.push(RerankedChunk {
                    chunk: documents[index].clone(),
                    rerank_score,
                });
            }
            _ => {}
        }
    }

    reranked
}
