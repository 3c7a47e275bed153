//! Pre-flight checks before network operations.
//!
//! Validates that the API keys the configured providers need are present
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{LexragError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Answering needs every configured provider.
    Ask,
    /// Search needs embeddings, the index and the reranker.
    Search,
    /// Ingestion needs embeddings only.
    Ingest,
}

/// A credential a provider reads from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequirement {
    /// What needs it, e.g. "embedding (together)".
    pub role: String,
    pub var: &'static str,
}

impl KeyRequirement {
    pub fn is_set(&self) -> bool {
        std::env::var(self.var).is_ok_and(|v| !v.is_empty())
    }
}

/// Environment variables required by the providers `operation` uses.
pub fn required_keys(settings: &Settings, operation: Operation) -> Vec<KeyRequirement> {
    let mut keys = Vec::new();

    push_key(&mut keys, "embedding", &settings.embedding.provider);

    if operation != Operation::Ingest {
        push_key(&mut keys, "vector store", &settings.vector_store.provider);
        push_key(&mut keys, "reranker", &settings.reranker.provider);
    }
    if operation == Operation::Ask {
        push_key(&mut keys, "llm", &settings.llm.provider);
    }

    keys
}

fn push_key(keys: &mut Vec<KeyRequirement>, role: &str, provider: &str) {
    if let Some(var) = key_var(provider) {
        keys.push(KeyRequirement {
            role: format!("{} ({})", role, provider),
            var,
        });
    }
}

/// API key variable for a provider name; `None` for local providers.
fn key_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "together" | "together_ai" | "togetherai" => Some("TOGETHER_API_KEY"),
        "pinecone" => Some("PINECONE_API_KEY"),
        "cohere" => Some("COHERE_API_KEY"),
        _ => None,
    }
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error naming the first missing key.
pub fn check(settings: &Settings, operation: Operation) -> Result<()> {
    match required_keys(settings, operation)
        .into_iter()
        .find(|key| !key.is_set())
    {
        Some(missing) => Err(LexragError::Config(format!(
            "{} not set (needed by {}). Set it with: export {}='...'",
            missing.var, missing.role, missing.var
        ))),
        None => Ok(()),
    }
}
