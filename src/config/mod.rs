//! Configuration module for Lexrag.
//!
//! Handles loading application settings and the prompt template registry.

mod settings;
pub mod templates;

pub use settings::{
    EmbeddingSettings, GeneralSettings, IngestSettings, LlmSettings, ProviderSettings,
    RerankerSettings, RetrievalSettings, Settings, TemplateSettings, VectorStoreSettings,
};
pub use templates::TemplateRegistry;
