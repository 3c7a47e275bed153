//! Text generation with chat models.

mod openai;

pub use openai::ChatGenerator;

use crate::config::{LlmSettings, ProviderSettings};
use crate::error::{LexragError, Result};
use crate::openai::ApiFlavor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Sampling options for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Lower is more deterministic.
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl GenerationOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens: None,
            stop: None,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::with_temperature(0.2)
    }
}

/// Trait for generative models.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for a single user prompt.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// Create the generator named by `settings.provider`.
pub fn create_generator(
    settings: &LlmSettings,
    providers: &ProviderSettings,
) -> Result<Arc<dyn Generator>> {
    let flavor = ApiFlavor::from_provider(&settings.provider)
        .ok_or_else(|| LexragError::Config(format!("Unknown LLM provider: {}", settings.provider)))?;

    let generator = ChatGenerator::new(
        flavor,
        &settings.model,
        Duration::from_secs(providers.timeout_secs),
    )?
    .with_max_tokens(settings.max_tokens);

    Ok(Arc::new(generator))
}
