//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingSettings, ProviderSettings};
use crate::error::{LexragError, Result};
use crate::openai::ApiFlavor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier used for logging and diagnostics.
    fn model_name(&self) -> &str;
}

/// Create the embedder named by `settings.provider`.
pub fn create_embedder(
    settings: &EmbeddingSettings,
    providers: &ProviderSettings,
) -> Result<Arc<dyn Embedder>> {
    let flavor = ApiFlavor::from_provider(&settings.provider).ok_or_else(|| {
        LexragError::Config(format!("Unknown embedding provider: {}", settings.provider))
    })?;

    let embedder = OpenAIEmbedder::new(
        flavor,
        &settings.model,
        settings.dimensions,
        Duration::from_secs(providers.timeout_secs),
    )?
    .with_batch_size(settings.batch_size);

    Ok(Arc::new(embedder))
}
