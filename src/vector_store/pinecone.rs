//! Pinecone vector index over the data-plane REST API.

use super::{provider_timeout, IndexMatch, VectorIndex};
use crate::config::ProviderSettings;
use crate::error::{LexragError, Result};
use crate::http::JsonClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

const API_VERSION: &str = "2024-07";

/// Query-only handle on a Pinecone index.
pub struct PineconeIndex {
    http: JsonClient,
    query_url: String,
    namespace: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

impl PineconeIndex {
    /// Create a handle for the index served at `host`.
    ///
    /// Reads `PINECONE_API_KEY` from the environment.
    pub fn new(host: &str, namespace: &str, providers: &ProviderSettings) -> Result<Self> {
        let api_key = match std::env::var("PINECONE_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                return Err(LexragError::Config(
                    "PINECONE_API_KEY not set. Set it with: export PINECONE_API_KEY='...'".to_string(),
                ))
            }
        };

        Ok(Self {
            http: JsonClient::new(provider_timeout(providers), providers.max_retries)
                .map_err(LexragError::Config)?,
            query_url: query_url(host)?,
            namespace: namespace.to_string(),
            api_key,
        })
    }
}

/// Build the `/query` URL from an index host, with or without a scheme.
fn query_url(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    let url = Url::parse(&format!("{}/", base))
        .and_then(|u| u.join("query"))
        .map_err(|e| LexragError::Config(format!("Invalid Pinecone host '{}': {}", host, e)))?;
    Ok(url.to_string())
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    #[instrument(skip(self, vector, filter), fields(namespace = %self.namespace))]
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        filter: Option<&Value>,
    ) -> Result<Vec<IndexMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: &self.namespace,
            filter,
        };

        let headers = [
            ("Api-Key", self.api_key.clone()),
            ("X-Pinecone-API-Version", API_VERSION.to_string()),
        ];

        let response: QueryResponse = self
            .http
            .post(&self.query_url, &headers, &request)
            .await
            .map_err(LexragError::IndexQuery)?;

        debug!("Pinecone returned {} matches", response.matches.len());
        Ok(response.matches)
    }
}
