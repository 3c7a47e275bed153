//! In-process fakes for provider traits, used by unit tests.

use crate::embedding::Embedder;
use crate::error::{LexragError, Result};
use crate::llm::{GenerationOptions, Generator};
use crate::rag::{RerankedChunk, RetrievedChunk};
use crate::rerank::Reranker;
use crate::vector_store::{IndexMatch, Metadata, VectorIndex};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Embeds every text as a fixed vector and records the inputs.
#[derive(Default)]
pub struct FakeEmbedder {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(LexragError::Embedding("provider unavailable".to_string()));
        }
        Ok(vec![1.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// Returns a preset list of matches, truncated to `top_k`.
#[derive(Default)]
pub struct FakeIndex {
    pub matches: Vec<IndexMatch>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_filter: Mutex<Option<Value>>,
}

impl FakeIndex {
    pub fn with_matches(matches: Vec<IndexMatch>) -> Self {
        Self { matches, ..Default::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn search(
        &self,
        _vector: &[f32],
        top_k: usize,
        _include_metadata: bool,
        filter: Option<&Value>,
    ) -> Result<Vec<IndexMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = filter.cloned();
        if self.fail {
            return Err(LexragError::IndexQuery("index unreachable".to_string()));
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

/// Build a match whose metadata holds `text` and `reference`.
pub fn index_match(id: &str, score: f32, text: &str, reference: &str) -> IndexMatch {
    IndexMatch {
        id: id.to_string(),
        score,
        metadata: metadata(json!({ "text": text, "reference": reference })),
    }
}

pub fn metadata(value: Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

/// The five matches of the "director duties" scenario.
pub fn director_duties_matches() -> Vec<IndexMatch> {
    vec![
        index_match("s143", 0.92, "Directors must act within their powers.", "Companies Act 2015, Section 143"),
        index_match("s145", 0.88, "Directors must promote the success of the company.", "Companies Act 2015, Section 145"),
        index_match("s147", 0.85, "Directors must exercise reasonable care, skill and diligence.", "Companies Act 2015, Section 147"),
        index_match("s200", 0.30, "Annual returns must be filed.", "Companies Act 2015, Section 200"),
        index_match("s900", 0.10, "Transitional provisions.", "Companies Act 2015, Schedule 7"),
    ]
}

/// Returns a fixed completion and records prompts and options.
pub struct FakeGenerator {
    pub response: String,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub options: Mutex<Vec<GenerationOptions>>,
}

impl FakeGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new("") }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(options.clone());
        if self.fail {
            return Err(LexragError::Generation("model overloaded".to_string()));
        }
        Ok(self.response.clone())
    }
}

/// How a [`FakeReranker`] responds.
pub enum RerankBehavior {
    /// Reverse the input order, scoring the first output highest.
    Reverse,
    Fail,
    Empty,
    /// Sleep before answering, to trip the retriever's timeout.
    Stall(Duration),
}

pub struct FakeReranker {
    pub behavior: RerankBehavior,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<String>>,
}

impl FakeReranker {
    pub fn new(behavior: RerankBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Reranker for FakeReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[RetrievedChunk],
        top_n: usize,
    ) -> Result<Vec<RerankedChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_string());

        match &self.behavior {
            RerankBehavior::Reverse => Ok(documents
                .iter()
                .rev()
                .take(top_n)
                .enumerate()
                .map(|(i, d)| RerankedChunk {
                    chunk: d.clone(),
                    rerank_score: 1.0 - i as f32 * 0.1,
                })
                .collect()),
            RerankBehavior::Fail => Err(LexragError::Rerank("rerank service down".to_string())),
            RerankBehavior::Empty => Ok(Vec::new()),
            RerankBehavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }
}
