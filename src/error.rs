//! Error types for Lexrag.

use thiserror::Error;

/// Library-level error type for Lexrag operations.
///
/// `Embedding`, `IndexQuery`, `Generation`, `TemplateValidation` and
/// `Alignment` abort a query. `Rerank` is raised by rerankers but the
/// retriever recovers from it by keeping the unreranked ordering.
#[derive(Error, Debug)]
pub enum LexragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index query failed: {0}")]
    IndexQuery(String),

    #[error("Reranking failed: {0}")]
    Rerank(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid template: {0}")]
    TemplateValidation(String),

    #[error("Result alignment violated: {0}")]
    Alignment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Lexrag operations.
pub type Result<T> = std::result::Result<T, LexragError>;
