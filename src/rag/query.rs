//! Query preparation: optional expansion, then embedding.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::{GenerationOptions, Generator};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};

/// Sampling temperature for expansion prompts.
const EXPANSION_TEMPERATURE: f32 = 0.3;

const EXPANSION_PROMPT: &str = r#"Given the search query below, expand it with additional relevant terms to improve the search results.
Add related concepts and alternative phrasings to the search query.

Original Query: "{query}"

Expanded query:"#;

/// The query that will be searched, with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub effective_query: String,
    pub embedding: Vec<f32>,
}

/// Prepares queries for vector search.
pub struct QueryProcessor {
    embedder: Arc<dyn Embedder>,
    generator: Option<Arc<dyn Generator>>,
}

impl QueryProcessor {
    /// Create a processor that embeds queries as given.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            generator: None,
        }
    }

    /// Bind a generator used for query expansion.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn can_expand(&self) -> bool {
        self.generator.is_some()
    }

    /// Resolve the effective query and embed it.
    ///
    /// With `expand` set and a generator bound, the expanded text is embedded
    /// directly in place of the original. Embedding errors propagate.
    #[instrument(skip(self))]
    pub async fn prepare(&self, query: &str, expand: bool) -> Result<PreparedQuery> {
        let effective_query = match (&self.generator, expand) {
            (Some(generator), true) => self.expand(generator.as_ref(), query).await?,
            _ => query.to_string(),
        };

        let embedding = self.embedder.embed(&effective_query).await?;

        Ok(PreparedQuery {
            effective_query,
            embedding,
        })
    }

    async fn expand(&self, generator: &dyn Generator, query: &str) -> Result<String> {
        let prompt = EXPANSION_PROMPT.replace("{query}", query);
        let raw = generator
            .generate(&prompt, &GenerationOptions::with_temperature(EXPANSION_TEMPERATURE))
            .await?;

        let expanded = clean_expansion(&raw);
        if expanded.is_empty() {
            debug!("Expansion came back empty, searching with the original query");
            return Ok(query.to_string());
        }

        debug!("Expanded query: {}", expanded);
        Ok(expanded)
    }
}

/// Strip leading non-alphanumeric characters and trailing whitespace from
/// a generated expansion.
pub fn clean_expansion(raw: &str) -> String {
    static LEADING: OnceLock<Regex> = OnceLock::new();
    let re = LEADING.get_or_init(|| Regex::new(r"^[^a-zA-Z0-9]*").expect("valid regex"));
    re.replace(raw, "").trim_end().to_string()
}
