//! End-to-end question answering.

use super::{
    AnswerGenerator, FormattedChunk, PipelineConfig, QueryProcessor, RetrievedChunk, Retriever,
};
use crate::config::TemplateRegistry;
use crate::embedding::Embedder;
use crate::error::{LexragError, Result};
use crate::llm::Generator;
use crate::rerank::Reranker;
use crate::vector_store::VectorIndex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Provider handles shared by every pipeline.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub generator: Arc<dyn Generator>,
}

/// Per-query overrides. Unset fields use the pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub top_k: Option<usize>,
    pub use_query_expansion: Option<bool>,
    pub rerank_results: Option<bool>,
    pub template_type: Option<String>,
    /// Template text overriding `template_type`.
    pub custom_template: Option<String>,
}

impl QueryOptions {
    /// Reject overrides no search can honour.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == Some(0) {
            return Err(LexragError::InvalidInput("top_k must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// The result of answering one query.
///
/// `retrieved_chunks`, `sources` and `formatted_chunks` describe the same
/// passages at the same positions.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub has_context: bool,
    pub template_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_char_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_used: Option<usize>,
    pub sources: Vec<RetrievedChunk>,
    pub retrieved_chunks: Vec<String>,
    pub formatted_chunks: Vec<FormattedChunk>,
    pub retrieval_count: usize,
    pub query: String,
}

/// Retrieval followed by grounded generation.
pub struct RagPipeline {
    retriever: Retriever,
    answers: AnswerGenerator,
    config: PipelineConfig,
}

impl RagPipeline {
    /// Build a pipeline from providers and an immutable configuration.
    pub fn new(
        providers: &Providers,
        templates: Arc<TemplateRegistry>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let query_processor = QueryProcessor::new(providers.embedder.clone())
            .with_generator(providers.generator.clone());
        let retriever = Retriever::new(
            query_processor,
            providers.index.clone(),
            config.min_score_threshold,
        )
        .with_reranker(providers.reranker.clone());

        let answers = AnswerGenerator::new(
            providers.generator.clone(),
            templates,
            &config.template_type,
            config.max_context_length,
            config.temperature,
        );

        Ok(Self {
            retriever,
            answers,
            config,
        })
    }

    /// Metadata filter applied to every search.
    pub fn with_filter(mut self, filter: Option<Value>) -> Self {
        self.retriever = self.retriever.with_filter(filter);
        self
    }

    pub fn with_rerank_timeout(mut self, timeout: Duration) -> Self {
        self.retriever = self.retriever.with_rerank_timeout(timeout);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Retrieve passages without generating an answer.
    pub async fn retrieve(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<(Vec<String>, Vec<RetrievedChunk>)> {
        options.validate()?;

        self.retriever
            .retrieve(
                query,
                options.top_k.unwrap_or(self.config.top_k),
                options
                    .use_query_expansion
                    .unwrap_or(self.config.use_query_expansion),
                options.rerank_results.unwrap_or(self.config.rerank_results),
            )
            .await
    }

    /// Answer `query` from the index.
    #[instrument(skip(self, options))]
    pub async fn process_query(&self, query: &str, options: &QueryOptions) -> Result<AnswerResult> {
        let (retrieved_chunks, sources) = self.retrieve(query, options).await?;
        info!("Retrieved {} passages", sources.len());

        let formatted_chunks = format_chunks(&retrieved_chunks, &sources)?;

        let generated = self
            .answers
            .generate_answer(
                query,
                &retrieved_chunks,
                options.template_type.as_deref(),
                options.custom_template.as_deref(),
            )
            .await?;

        Ok(AnswerResult {
            answer: generated.answer,
            has_context: generated.has_context,
            template_used: generated.template_used,
            context_char_count: generated.context_char_count,
            chunks_used: generated.chunks_used,
            retrieval_count: sources.len(),
            sources,
            retrieved_chunks,
            formatted_chunks,
            query: query.to_string(),
        })
    }
}

/// Number passages for display, checking that both views line up.
pub fn format_chunks(
    retrieved_chunks: &[String],
    sources: &[RetrievedChunk],
) -> Result<Vec<FormattedChunk>> {
    if retrieved_chunks.len() != sources.len() {
        return Err(LexragError::Alignment(format!(
            "{} chunks but {} sources",
            retrieved_chunks.len(),
            sources.len()
        )));
    }

    retrieved_chunks
        .iter()
        .zip(sources)
        .enumerate()
        .map(|(i, (text, source))| {
            if *text != source.text {
                return Err(LexragError::Alignment(format!(
                    "chunk {} does not match its source ({})",
                    i + 1,
                    source.reference
                )));
            }
            Ok(FormattedChunk {
                index: i + 1,
                text: text.clone(),
                reference: source.reference.clone(),
                score: source.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::NO_CONTEXT_ANSWER;
    use crate::testing::{
        director_duties_matches, FakeEmbedder, FakeGenerator, FakeIndex, FakeReranker,
        RerankBehavior,
    };

    fn providers(
        index: FakeIndex,
        reranker: Option<Arc<dyn Reranker>>,
        generator: Arc<FakeGenerator>,
    ) -> Providers {
        Providers {
            embedder: Arc::new(FakeEmbedder::default()),
            index: Arc::new(index),
            reranker,
            generator,
        }
    }

    fn pipeline(providers: &Providers) -> RagPipeline {
        let config = PipelineConfig {
            top_k: 5,
            ..Default::default()
        };
        RagPipeline::new(providers, Arc::new(TemplateRegistry::default()), config).unwrap()
    }

    fn assert_aligned(result: &AnswerResult) {
        assert_eq!(result.retrieved_chunks.len(), result.sources.len());
        assert_eq!(result.sources.len(), result.formatted_chunks.len());
        for (i, formatted) in result.formatted_chunks.iter().enumerate() {
            assert_eq!(formatted.index, i + 1);
            assert_eq!(formatted.text, result.retrieved_chunks[i]);
            assert_eq!(formatted.text, result.sources[i].text);
            assert_eq!(formatted.reference, result.sources[i].reference);
        }
    }

    #[tokio::test]
    async fn test_empty_index_gives_no_context_answer() {
        let generator = Arc::new(FakeGenerator::new("invented"));
        let providers = providers(FakeIndex::default(), None, generator.clone());

        let result = pipeline(&providers)
            .process_query("director duties", &QueryOptions::default())
            .await
            .unwrap();

        assert!(!result.has_context);
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert_eq!(result.retrieval_count, 0);
        assert!(result.formatted_chunks.is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_director_duties_without_rerank() {
        let generator = Arc::new(FakeGenerator::new("Directors have general duties."));
        let providers = providers(
            FakeIndex::with_matches(director_duties_matches()),
            None,
            generator.clone(),
        );

        let options = QueryOptions {
            rerank_results: Some(false),
            ..Default::default()
        };
        let result = pipeline(&providers)
            .process_query("director duties", &options)
            .await
            .unwrap();

        assert!(result.has_context);
        assert_eq!(result.retrieval_count, 3);
        assert_eq!(result.template_used, "factual_qa");
        assert_eq!(result.query, "director duties");
        assert_aligned(&result);
        for source in &result.sources {
            assert!(source.score >= 0.40);
        }
        let scores: Vec<f32> = result.formatted_chunks.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.92, 0.88, 0.85]);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_director_duties_with_reversing_reranker() {
        let generator = Arc::new(FakeGenerator::new("Directors have general duties."));
        let providers = providers(
            FakeIndex::with_matches(director_duties_matches()),
            Some(Arc::new(FakeReranker::new(RerankBehavior::Reverse))),
            generator,
        );

        let result = pipeline(&providers)
            .process_query("director duties", &QueryOptions::default())
            .await
            .unwrap();

        assert_aligned(&result);
        let scores: Vec<f32> = result.sources.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![0.85, 0.88, 0.92]);
    }

    #[tokio::test]
    async fn test_options_override_template() {
        let generator = Arc::new(FakeGenerator::new("answer"));
        let providers = providers(
            FakeIndex::with_matches(director_duties_matches()),
            None,
            generator,
        );

        let options = QueryOptions {
            template_type: Some("multi_perspective".to_string()),
            ..Default::default()
        };
        let result = pipeline(&providers)
            .process_query("director duties", &options)
            .await
            .unwrap();
        assert_eq!(result.template_used, "multi_perspective");
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let providers = providers(
            FakeIndex::with_matches(director_duties_matches()),
            None,
            Arc::new(FakeGenerator::failing()),
        );

        let err = pipeline(&providers)
            .process_query("director duties", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LexragError::Generation(_)));
    }

    #[tokio::test]
    async fn test_zero_top_k_never_reaches_index() {
        let index = Arc::new(FakeIndex::with_matches(director_duties_matches()));
        let providers = Providers {
            embedder: Arc::new(FakeEmbedder::default()),
            index: index.clone(),
            reranker: None,
            generator: Arc::new(FakeGenerator::new("answer")),
        };
        let pipeline = pipeline(&providers);
        let options = QueryOptions {
            top_k: Some(0),
            ..Default::default()
        };

        let err = pipeline.retrieve("director duties", &options).await.unwrap_err();
        assert!(matches!(err, LexragError::InvalidInput(_)));

        let err = pipeline.process_query("director duties", &options).await.unwrap_err();
        assert!(matches!(err, LexragError::InvalidInput(_)));

        assert_eq!(index.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let providers = providers(FakeIndex::default(), None, Arc::new(FakeGenerator::new("")));
        let config = PipelineConfig {
            min_score_threshold: 2.0,
            ..Default::default()
        };
        assert!(RagPipeline::new(&providers, Arc::new(TemplateRegistry::default()), config).is_err());
    }

    #[test]
    fn test_format_chunks_rejects_misalignment() {
        let sources = vec![
            RetrievedChunk::new("first", "s.1", 0.9),
            RetrievedChunk::new("second", "s.2", 0.8),
        ];

        let short = vec!["first".to_string()];
        assert!(matches!(
            format_chunks(&short, &sources),
            Err(LexragError::Alignment(_))
        ));

        let swapped = vec!["second".to_string(), "first".to_string()];
        assert!(matches!(
            format_chunks(&swapped, &sources),
            Err(LexragError::Alignment(_))
        ));

        let aligned = vec!["first".to_string(), "second".to_string()];
        let formatted = format_chunks(&aligned, &sources).unwrap();
        assert_eq!(formatted[1].index, 2);
        assert_eq!(formatted[1].reference, "s.2");
    }
}
