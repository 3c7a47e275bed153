//! Provider wiring for Lexrag.
//!
//! Resolves the configured providers once and hands out pipelines,
//! retrievers and ingestors built on them.

use crate::config::{Settings, TemplateRegistry};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{LexragError, Result};
use crate::history::QueryLog;
use crate::ingest::{IngestResult, Ingestor};
use crate::llm::{create_generator, Generator};
use crate::rag::{
    AnswerResult, PipelineConfig, Providers, QueryOptions, QueryProcessor, RagPipeline,
    RetrievedChunk, Retriever,
};
use crate::rerank::{create_reranker, Reranker};
use crate::vector_store::{open_index, IndexWriter, VectorIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// File extensions picked up when ingesting a directory.
const INGEST_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// The main orchestrator for Lexrag.
pub struct Orchestrator {
    settings: Settings,
    templates: Arc<TemplateRegistry>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    writer: Option<Arc<dyn IndexWriter>>,
    reranker: Option<Arc<dyn Reranker>>,
    generator: Option<Arc<dyn Generator>>,
    query_log: Option<QueryLog>,
}

impl Orchestrator {
    /// Create an orchestrator with every configured provider.
    pub fn new(settings: Settings) -> Result<Self> {
        let generator = create_generator(&settings.llm, &settings.providers)?;
        let mut orchestrator = Self::retrieval_only(settings)?;
        info!(
            "Using {} ({}) for generation",
            orchestrator.settings.llm.model, orchestrator.settings.llm.provider
        );
        orchestrator.generator = Some(generator);
        Ok(orchestrator)
    }

    /// Create an orchestrator without a generator.
    ///
    /// Enough for search and ingestion; `ask` fails and query expansion is
    /// skipped.
    pub fn retrieval_only(settings: Settings) -> Result<Self> {
        let templates = Arc::new(TemplateRegistry::load(settings.templates.custom_dir.as_deref())?);
        let embedder = create_embedder(&settings.embedding, &settings.providers)?;
        let opened = open_index(&settings)?;
        let reranker = create_reranker(&settings.reranker, &settings.providers)?;

        info!(
            "Using {} embeddings ({}), {} index, reranker {}",
            settings.embedding.provider,
            embedder.model_name(),
            settings.vector_store.provider,
            settings.reranker.provider
        );

        let query_log = settings
            .general
            .log_queries
            .then(|| QueryLog::new(&settings.log_dir()));

        Ok(Self {
            settings,
            templates,
            embedder,
            index: opened.search,
            writer: opened.writer,
            reranker,
            generator: None,
            query_log,
        })
    }

    /// Create an orchestrator from explicit components.
    pub fn with_components(
        settings: Settings,
        templates: Arc<TemplateRegistry>,
        providers: Providers,
        writer: Option<Arc<dyn IndexWriter>>,
    ) -> Self {
        Self {
            settings,
            templates,
            embedder: providers.embedder,
            index: providers.index,
            writer,
            reranker: providers.reranker,
            generator: Some(providers.generator),
            query_log: None,
        }
    }

    /// Log answered queries into `log_dir`.
    pub fn with_query_log(mut self, log_dir: &Path) -> Self {
        self.query_log = Some(QueryLog::new(log_dir));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn templates(&self) -> Arc<TemplateRegistry> {
        self.templates.clone()
    }

    /// Provider handles for a pipeline. Requires a generator.
    pub fn providers(&self) -> Result<Providers> {
        let generator = self.generator.clone().ok_or_else(|| {
            LexragError::Config("No generator configured; answering needs an LLM provider".to_string())
        })?;

        Ok(Providers {
            embedder: self.embedder.clone(),
            index: self.index.clone(),
            reranker: self.reranker.clone(),
            generator,
        })
    }

    fn rerank_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.reranker.timeout_secs)
    }

    /// Build a pipeline for the given configuration.
    pub fn pipeline(&self, config: PipelineConfig) -> Result<RagPipeline> {
        Ok(RagPipeline::new(&self.providers()?, self.templates.clone(), config)?
            .with_filter(self.settings.vector_store.filter.clone())
            .with_rerank_timeout(self.rerank_timeout()))
    }

    /// Answer a question with the configured defaults.
    #[instrument(skip(self, options))]
    pub async fn ask(&self, query: &str, options: &QueryOptions) -> Result<AnswerResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LexragError::InvalidInput("Query is empty".to_string()));
        }

        let pipeline = self.pipeline(self.settings.pipeline_config())?;
        let result = pipeline.process_query(query, options).await?;

        if let Some(log) = &self.query_log {
            log.record(&result);
        }

        Ok(result)
    }

    /// Retrieve passages without generating an answer.
    #[instrument(skip(self, options))]
    pub async fn search(&self, query: &str, options: &QueryOptions) -> Result<Vec<RetrievedChunk>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LexragError::InvalidInput("Query is empty".to_string()));
        }

        options.validate()?;
        let config = self.settings.pipeline_config();
        config.validate()?;

        let mut processor = QueryProcessor::new(self.embedder.clone());
        if let Some(generator) = &self.generator {
            processor = processor.with_generator(generator.clone());
        }

        let retriever = Retriever::new(processor, self.index.clone(), config.min_score_threshold)
            .with_reranker(self.reranker.clone())
            .with_filter(self.settings.vector_store.filter.clone())
            .with_rerank_timeout(self.rerank_timeout());

        let (_, sources) = retriever
            .retrieve(
                query,
                options.top_k.unwrap_or(config.top_k),
                options.use_query_expansion.unwrap_or(config.use_query_expansion),
                options.rerank_results.unwrap_or(config.rerank_results),
            )
            .await?;

        Ok(sources)
    }

    /// Ingest a text file, or every `.txt`/`.md` file in a directory.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn ingest(&self, path: &Path) -> Result<Vec<IngestResult>> {
        let writer = self.writer.clone().ok_or_else(|| {
            LexragError::Config(format!(
                "The {} index is read-only; ingest into a sqlite or memory index",
                self.settings.vector_store.provider
            ))
        })?;

        let ingestor = Ingestor::new(self.embedder.clone(), writer)
            .with_settings(&self.settings.ingest)
            .with_batch_size(self.settings.embedding.batch_size);

        let mut results = Vec::new();
        for file in collect_files(path)? {
            match ingestor.ingest_file(&file).await {
                Ok(result) => results.push(result),
                Err(LexragError::Io(e)) => warn!("Skipping unreadable {}: {}", file.display(), e),
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// Number of records in the local index, when it is writable.
    pub async fn index_count(&self) -> Result<Option<usize>> {
        match &self.writer {
            Some(writer) => Ok(Some(writer.count().await?)),
            None => Ok(None),
        }
    }
}

/// Resolve ingestion inputs: a single file, or a directory's text files.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(LexragError::InvalidInput(format!("No such file or directory: {}", path.display())));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| INGEST_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    Ok(files)
}
