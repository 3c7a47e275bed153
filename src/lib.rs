//! Lexrag - grounded question answering over legal text
//!
//! A retrieval-augmented generation pipeline: questions are embedded,
//! matched against a vector index of statute passages, optionally reranked,
//! and answered by a chat model from the retrieved passages only.
//!
//! # Overview
//!
//! Lexrag allows you to:
//! - Ask questions and get answers grounded in cited passages
//! - Search an index semantically without generating an answer
//! - Ingest text documents into a local index
//! - Serve the pipeline over HTTP
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index abstraction (SQLite, in-memory, Pinecone)
//! - `rerank` - Optional passage reranking
//! - `llm` - Text generation
//! - `rag` - Query preparation, retrieval, context assembly and answering
//! - `ingest` - Document chunking and indexing
//! - `history` - Query log
//! - `orchestrator` - Provider wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use lexrag::config::Settings;
//! use lexrag::orchestrator::Orchestrator;
//! use lexrag::rag::QueryOptions;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator
//!         .ask("What are the duties of a director?", &QueryOptions::default())
//!         .await?;
//!     println!("{}", result.answer);
//!     for chunk in &result.formatted_chunks {
//!         println!("[{}] {} ({:.2})", chunk.index, chunk.reference, chunk.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub(crate) mod http;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod rerank;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{LexragError, Result};
