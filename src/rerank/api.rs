//! Hosted rerank endpoints (Together AI, Cohere).
//!
//! Both services accept `{model, query, documents, top_n}` and answer with
//! `results: [{index, relevance_score}]` ordered by relevance.

use super::{apply_rerank_results, Reranker};
use crate::config::ProviderSettings;
use crate::error::{LexragError, Result};
use crate::http::JsonClient;
use crate::rag::{RerankedChunk, RetrievedChunk};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Supported rerank services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankApi {
    Together,
    Cohere,
}

impl RerankApi {
    fn endpoint(&self) -> &'static str {
        match self {
            RerankApi::Together => "https://api.together.xyz/v1/rerank",
            RerankApi::Cohere => "https://api.cohere.com/v1/rerank",
        }
    }

    pub fn key_var(&self) -> &'static str {
        match self {
            RerankApi::Together => "TOGETHER_API_KEY",
            RerankApi::Cohere => "COHERE_API_KEY",
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Reranker backed by a hosted rerank API.
pub struct ApiReranker {
    api: RerankApi,
    http: JsonClient,
    model: String,
    api_key: String,
}

impl ApiReranker {
    /// Create a reranker. Fails if the service's API key is not set.
    pub fn new(api: RerankApi, model: &str, providers: &ProviderSettings) -> Result<Self> {
        let api_key = match std::env::var(api.key_var()) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Err(LexragError::Config(format!(
                    "{} not set. Set it with: export {}='...'",
                    api.key_var(),
                    api.key_var()
                )))
            }
        };

        let http = JsonClient::new(Duration::from_secs(providers.timeout_secs), providers.max_retries)
            .map_err(LexragError::Config)?;

        Ok(Self {
            api,
            http,
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Reranker for ApiReranker {
    #[instrument(skip(self, query, documents), fields(api = ?self.api, count = documents.len()))]
    async fn rerank(
        &self,
        query: &str,
        documents: &[RetrievedChunk],
        top_n: usize,
    ) -> Result<Vec<RerankedChunk>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let top_n = if top_n == 0 { documents.len() } else { top_n.min(documents.len()) };
        let request = RerankRequest {
            model: &self.model,
            query,
            documents: documents.iter().map(|d| d.text.as_str()).collect(),
            top_n,
        };

        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let response: RerankResponse = self
            .http
            .post(self.api.endpoint(), &headers, &request)
            .await
            .map_err(LexragError::Rerank)?;

        debug!("Rerank returned {} results", response.results.len());

        Ok(apply_rerank_results(
            documents,
            response.results.into_iter().map(|r| (r.index, r.relevance_score)),
            top_n,
        ))
    }
}
