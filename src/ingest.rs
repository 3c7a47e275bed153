//! Document ingestion into a local vector index.
//!
//! Text files are split into overlapping character windows, embedded in
//! batches and upserted with `text` and `reference` metadata, the layout the
//! retriever reads back.

use crate::config::IngestSettings;
use crate::embedding::Embedder;
use crate::error::{LexragError, Result};
use crate::vector_store::{IndexRecord, IndexWriter};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Split `text` into windows of `chunk_size` characters, consecutive windows
/// sharing `overlap` characters. Whitespace-only windows are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(LexragError::Config("chunk_size must be greater than 0".to_string()));
    }
    if overlap >= chunk_size {
        return Err(LexragError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window.trim().to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub reference: String,
    pub chunks_indexed: usize,
}

/// Chunks, embeds and stores documents.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    writer: Arc<dyn IndexWriter>,
    chunk_size: usize,
    chunk_overlap: usize,
    batch_size: usize,
    max_concurrent: usize,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, writer: Arc<dyn IndexWriter>) -> Self {
        let defaults = IngestSettings::default();
        Self {
            embedder,
            writer,
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
            batch_size: 100,
            max_concurrent: defaults.max_concurrent,
        }
    }

    /// Apply chunking and concurrency settings.
    pub fn with_settings(mut self, settings: &IngestSettings) -> Self {
        self.chunk_size = settings.chunk_size;
        self.chunk_overlap = settings.chunk_overlap;
        self.max_concurrent = settings.max_concurrent.max(1);
        self
    }

    /// Maximum texts per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Ingest a UTF-8 text file, citing it by file stem.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestResult> {
        let text = std::fs::read_to_string(path)?;
        let reference = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| LexragError::InvalidInput(format!("Not a file: {}", path.display())))?;

        let source = path.display().to_string();
        let chunks_indexed = self.ingest_text(&reference, &source, &text).await?;

        Ok(IngestResult {
            reference,
            chunks_indexed,
        })
    }

    /// Ingest `text`, returning the number of chunks written.
    ///
    /// Record IDs derive from `reference` and chunk position, so ingesting
    /// the same document again replaces its records.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn ingest_text(&self, reference: &str, source: &str, text: &str) -> Result<usize> {
        let chunks = chunk_text(text, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            info!("No text to index for {}", reference);
            return Ok(0);
        }

        let batches: Vec<Vec<String>> = chunks
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        debug!("Embedding {} chunks in {} batches", chunks.len(), batches.len());

        let mut embedded: Vec<(usize, Vec<Vec<f32>>)> = Vec::with_capacity(batches.len());
        let mut stream = stream::iter(batches.iter().enumerate())
            .map(|(idx, batch)| async move { (idx, self.embedder.embed_batch(batch).await) })
            .buffer_unordered(self.max_concurrent);

        while let Some((idx, result)) = stream.next().await {
            embedded.push((idx, result?));
        }
        embedded.sort_by_key(|(idx, _)| *idx);

        let vectors: Vec<Vec<f32>> = embedded.into_iter().flat_map(|(_, v)| v).collect();
        if vectors.len() != chunks.len() {
            return Err(LexragError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let slug = slugify(reference);
        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(order, (text, values))| IndexRecord {
                id: format!("{}-{}", slug, order),
                values,
                metadata: json!({
                    "text": text,
                    "reference": format!("{}, part {}", reference, order + 1),
                    "source": source,
                    "chunk": order,
                })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            })
            .collect();

        let written = self.writer.upsert_batch(&records).await?;
        info!("Indexed {} chunks from {}", written, reference);
        Ok(written)
    }
}

/// Lowercase ASCII alphanumerics joined by `-`.
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
