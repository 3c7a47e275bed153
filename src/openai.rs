//! Client construction for OpenAI-compatible APIs.
//!
//! Both OpenAI and Together AI speak the same chat and embeddings protocol,
//! so a single `async-openai` client serves either once the base URL and key
//! are set.

use crate::error::{LexragError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const TOGETHER_API_BASE: &str = "https://api.together.xyz/v1";

/// A hosted service exposing the OpenAI wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    OpenAI,
    Together,
}

impl ApiFlavor {
    /// Resolve a provider name from configuration.
    pub fn from_provider(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Some(ApiFlavor::OpenAI),
            "together" | "together_ai" | "togetherai" => Some(ApiFlavor::Together),
            _ => None,
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            ApiFlavor::OpenAI => OPENAI_API_BASE,
            ApiFlavor::Together => TOGETHER_API_BASE,
        }
    }

    /// Environment variable holding the API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            ApiFlavor::OpenAI => "OPENAI_API_KEY",
            ApiFlavor::Together => "TOGETHER_API_KEY",
        }
    }

    /// Read the API key from the environment.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(self.key_var()) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(LexragError::Config(format!(
                "{} not set. Set it with: export {}='...'",
                self.key_var(),
                self.key_var()
            ))),
        }
    }
}

/// Create a client for the given API with a request timeout.
pub fn create_client(flavor: ApiFlavor, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LexragError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(flavor.api_base())
        .with_api_key(flavor.api_key()?);

    Ok(Client::with_config(config).with_http_client(http_client))
}
