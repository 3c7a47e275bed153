//! Configuration settings for Lexrag.

use crate::rag::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub reranker: RerankerSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
    pub templates: TemplateSettings,
    pub providers: ProviderSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Append a JSON record per answered query under `<data_dir>/logs`.
    pub log_queries: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lexrag".to_string(),
            log_level: "info".to_string(),
            log_queries: true,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (together, openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Requested output dimensions. Only sent to providers that accept it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Maximum texts per embeddings request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "together".to_string(),
            model: "BAAI/bge-large-en-v1.5".to_string(),
            dimensions: None,
            batch_size: 100,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector index provider (sqlite, pinecone, memory).
    pub provider: String,
    /// Path to the SQLite index (sqlite provider).
    pub sqlite_path: String,
    /// JSON file of records to seed the in-memory index with (memory provider).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_path: Option<String>,
    /// Pinecone index host, e.g. `https://legal-abc123.svc.us-east-1.pinecone.io`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_host: Option<String>,
    /// Pinecone namespace.
    pub namespace: String,
    /// Metadata filter passed through to every search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.lexrag/index.db".to_string(),
            memory_path: None,
            pinecone_host: None,
            namespace: String::new(),
            filter: None,
        }
    }
}

/// Reranker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    /// Reranker provider (none, together, cohere).
    pub provider: String,
    /// Reranking model.
    pub model: String,
    /// Upper bound on a single rerank call before falling back to vector order.
    pub timeout_secs: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: "Salesforce/Llama-Rank-V1".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// LLM provider (together, openai).
    pub provider: String,
    /// Chat model used for answers and query expansion.
    pub model: String,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "together".to_string(),
            model: "mistralai/Mistral-Small-24B-Instruct-2501".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
        }
    }
}

/// Retrieval defaults applied when a query doesn't override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub min_score_threshold: f32,
    pub use_query_expansion: bool,
    pub rerank_results: bool,
    /// Maximum characters of joined context sent to the model.
    pub max_context_length: usize,
    /// Default prompt template.
    pub template_type: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 40,
            min_score_threshold: 0.40,
            use_query_expansion: false,
            rerank_results: true,
            max_context_length: 4000,
            template_type: "factual_qa".to_string(),
        }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Concurrent embedding requests.
    pub max_concurrent: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            max_concurrent: 2,
        }
    }
}

/// Prompt template customization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct TemplateSettings {
    /// Directory of `*.toml` template files added to the registry.
    pub custom_dir: Option<String>,
}

/// Network behaviour shared by all remote providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for rate-limited or failed REST calls.
    pub max_retries: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            max_retries: 3,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LexragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexrag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite index path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Directory for query logs.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// Per-query pipeline defaults derived from these settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            top_k: self.retrieval.top_k,
            use_query_expansion: self.retrieval.use_query_expansion,
            rerank_results: self.retrieval.rerank_results,
            min_score_threshold: self.retrieval.min_score_threshold,
            max_context_length: self.retrieval.max_context_length,
            temperature: self.llm.temperature,
            template_type: self.retrieval.template_type.clone(),
        }
    }
}
