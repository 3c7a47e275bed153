//! RAG (Retrieval-Augmented Generation) for grounded question answering.
//!
//! A query flows through four stages:
//!
//! 1. [`QueryProcessor`] - optional LLM query expansion, then embedding
//! 2. [`Retriever`] - vector search, score filtering, optional reranking
//! 3. [`context::assemble`] - bounded context string for the prompt
//! 4. [`AnswerGenerator`] - template selection and generation
//!
//! [`RagPipeline`] runs them in order and returns an [`AnswerResult`] whose
//! `retrieved_chunks`, `sources` and `formatted_chunks` are index-aligned.

mod answer;
pub mod context;
mod pipeline;
mod query;
mod retriever;

pub use answer::{AnswerGenerator, GeneratedAnswer, NO_CONTEXT_ANSWER};
pub use pipeline::{format_chunks, AnswerResult, Providers, QueryOptions, RagPipeline};
pub use query::{clean_expansion, PreparedQuery, QueryProcessor};
pub use retriever::Retriever;

use crate::error::{LexragError, Result};
use serde::{Deserialize, Serialize};

/// Maximum characters of passage text shown in a preview.
pub const PREVIEW_CHARS: usize = 200;

/// A passage returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Full passage text.
    pub text: String,
    /// Citation for the passage (e.g. "Companies Act 2015, Section 143").
    pub reference: String,
    /// Vector similarity score.
    pub score: f32,
    /// First [`PREVIEW_CHARS`] characters of `text`, with "..." if cut.
    pub preview: String,
    /// Relevance score assigned by the reranker, when one ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl RetrievedChunk {
    pub fn new(text: &str, reference: &str, score: f32) -> Self {
        Self {
            text: text.to_string(),
            reference: reference.to_string(),
            score,
            preview: preview(text),
            rerank_score: None,
        }
    }
}

/// A passage reordered by a reranker.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedChunk {
    pub chunk: RetrievedChunk,
    pub rerank_score: f32,
}

impl RerankedChunk {
    /// Fold the rerank score back into the chunk.
    pub fn into_retrieved(self) -> RetrievedChunk {
        RetrievedChunk {
            rerank_score: Some(self.rerank_score),
            ..self.chunk
        }
    }
}

/// A retrieved passage numbered for display and citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedChunk {
    /// 1-based position in the result.
    pub index: usize,
    pub text: String,
    pub reference: String,
    pub score: f32,
}

/// Per-invocation pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub use_query_expansion: bool,
    pub rerank_results: bool,
    pub min_score_threshold: f32,
    pub max_context_length: usize,
    pub temperature: f32,
    pub template_type: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 25,
            use_query_expansion: false,
            rerank_results: true,
            min_score_threshold: 0.40,
            max_context_length: 4000,
            temperature: 0.2,
            template_type: crate::config::templates::DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(LexragError::Config("top_k must be greater than 0".to_string()));
        }
        if self.max_context_length == 0 {
            return Err(LexragError::Config(
                "max_context_length must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score_threshold) {
            return Err(LexragError::Config(format!(
                "min_score_threshold must be within [0, 1], got {}",
                self.min_score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(LexragError::Config(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Bounded prefix of a passage for display.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
