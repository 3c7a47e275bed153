//! Vector retrieval with score filtering and optional reranking.

use super::{QueryProcessor, RerankedChunk, RetrievedChunk};
use crate::error::Result;
use crate::rerank::Reranker;
use crate::vector_store::{IndexMatch, VectorIndex};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Metadata keys checked, in order, for a passage citation.
const REFERENCE_KEYS: [&str; 3] = ["reference", "ref", "source"];

const UNKNOWN_REFERENCE: &str = "Unknown";

/// Default upper bound on a rerank call.
pub const DEFAULT_RERANK_TIMEOUT: Duration = Duration::from_secs(15);

/// Retrieves passages relevant to a query.
pub struct Retriever {
    query_processor: QueryProcessor,
    index: Arc<dyn VectorIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    min_score_threshold: f32,
    filter: Option<Value>,
    rerank_timeout: Duration,
}

impl Retriever {
    pub fn new(
        query_processor: QueryProcessor,
        index: Arc<dyn VectorIndex>,
        min_score_threshold: f32,
    ) -> Self {
        Self {
            query_processor,
            index,
            reranker: None,
            min_score_threshold,
            filter: None,
            rerank_timeout: DEFAULT_RERANK_TIMEOUT,
        }
    }

    /// Bind a reranker; without one, `rerank_results` has no effect.
    pub fn with_reranker(mut self, reranker: Option<Arc<dyn Reranker>>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Metadata filter passed to every index search.
    pub fn with_filter(mut self, filter: Option<Value>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rerank_timeout(mut self, timeout: Duration) -> Self {
        self.rerank_timeout = timeout;
        self
    }

    /// Retrieve passages for `query`.
    ///
    /// Returns the passage texts and their sources, index-aligned. An empty
    /// pair means nothing relevant was found and is not an error.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        use_query_expansion: bool,
        rerank_results: bool,
    ) -> Result<(Vec<String>, Vec<RetrievedChunk>)> {
        if use_query_expansion && !self.query_processor.can_expand() {
            debug!("Query expansion requested without a generator, searching as given");
        }
        let prepared = self.query_processor.prepare(query, use_query_expansion).await?;

        let matches = self
            .index
            .search(&prepared.embedding, top_k, true, self.filter.as_ref())
            .await?;
        let candidates = matches.len();

        let sources: Vec<RetrievedChunk> = matches
            .iter()
            .filter_map(|m| self.to_chunk(m))
            .collect();

        debug!(
            "{} of {} matches passed filtering (threshold {:.2})",
            sources.len(),
            candidates,
            self.min_score_threshold
        );

        if sources.is_empty() {
            info!("No relevant passages for query");
            return Ok((Vec::new(), Vec::new()));
        }

        let sources = match (&self.reranker, rerank_results) {
            (Some(reranker), true) => self.rerank(reranker.as_ref(), query, sources, top_k).await,
            _ => sources,
        };

        let chunks = sources.iter().map(|s| s.text.clone()).collect();
        Ok((chunks, sources))
    }

    /// Convert a match, dropping empty passages and non-finite or below-threshold scores.
    fn to_chunk(&self, m: &IndexMatch) -> Option<RetrievedChunk> {
        let text = m.metadata_str("text").unwrap_or_default();
        if text.trim().is_empty() {
            return None;
        }
        if !m.score.is_finite() || m.score < self.min_score_threshold {
            return None;
        }

        let reference = REFERENCE_KEYS
            .iter()
            .filter_map(|key| m.metadata_str(key))
            .find(|r| !r.trim().is_empty())
            .unwrap_or(UNKNOWN_REFERENCE);

        Some(RetrievedChunk::new(text, reference, m.score))
    }

    /// Rerank against the original query, keeping vector order on any failure.
    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        sources: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Vec<RetrievedChunk> {
        let outcome = tokio::time::timeout(
            self.rerank_timeout,
            reranker.rerank(query, &sources, top_k),
        )
        .await;

        match outcome {
            Ok(Ok(reranked)) if !reranked.is_empty() => {
                debug!("Reranked {} passages to {}", sources.len(), reranked.len());
                reranked.into_iter().map(RerankedChunk::into_retrieved).collect()
            }
            Ok(Ok(_)) => {
                warn!("Reranker returned no results, keeping vector order");
                sources
            }
            Ok(Err(e)) => {
                warn!("Reranking failed, keeping vector order: {}", e);
                sources
            }
            Err(_) => {
                warn!(
                    "Reranking timed out after {:?}, keeping vector order",
                    self.rerank_timeout
                );
                sources
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexragError;
    use crate::testing::{
        director_duties_matches, index_match, metadata, FakeEmbedder, FakeGenerator, FakeIndex,
        FakeReranker, RerankBehavior,
    };
    use serde_json::json;

    fn retriever(index: FakeIndex, reranker: Option<Arc<dyn Reranker>>) -> Retriever {
        let processor = QueryProcessor::new(Arc::new(FakeEmbedder::default()));
        Retriever::new(processor, Arc::new(index), 0.40).with_reranker(reranker)
    }

    fn scores(sources: &[RetrievedChunk]) -> Vec<f32> {
        sources.iter().map(|s| s.score).collect()
    }

    #[tokio::test]
    async fn test_threshold_filtering_keeps_vector_order() {
        let retriever = retriever(FakeIndex::with_matches(director_duties_matches()), None);

        let (chunks, sources) = retriever
            .retrieve("director duties", 5, false, false)
            .await
            .unwrap();

        assert_eq!(scores(&sources), vec![0.92, 0.88, 0.85]);
        assert_eq!(chunks.len(), 3);
        for (chunk, source) in chunks.iter().zip(&sources) {
            assert_eq!(chunk, &source.text);
            assert!(source.score >= 0.40);
            assert!(source.rerank_score.is_none());
        }
        assert_eq!(sources[0].reference, "Companies Act 2015, Section 143");
    }

    #[tokio::test]
    async fn test_reversing_reranker_reorders_sources() {
        let reranker = Arc::new(FakeReranker::new(RerankBehavior::Reverse));
        let retriever = retriever(
            FakeIndex::with_matches(director_duties_matches()),
            Some(reranker.clone()),
        );

        let (chunks, sources) = retriever
            .retrieve("director duties", 5, false, true)
            .await
            .unwrap();

        assert_eq!(scores(&sources), vec![0.85, 0.88, 0.92]);
        let rerank_scores: Vec<f32> = sources.iter().filter_map(|s| s.rerank_score).collect();
        assert_eq!(rerank_scores.len(), 3);
        assert!(rerank_scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(chunks[0], sources[0].text);
        assert_eq!(
            reranker.last_query.lock().unwrap().as_deref(),
            Some("director duties")
        );
    }

    #[tokio::test]
    async fn test_rerank_disabled_skips_reranker() {
        let reranker = Arc::new(FakeReranker::new(RerankBehavior::Reverse));
        let retriever = retriever(
            FakeIndex::with_matches(director_duties_matches()),
            Some(reranker.clone()),
        );

        let (_, sources) = retriever
            .retrieve("director duties", 5, false, false)
            .await
            .unwrap();

        assert_eq!(scores(&sources), vec![0.92, 0.88, 0.85]);
        assert_eq!(reranker.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_reranker_falls_back() {
        for behavior in [RerankBehavior::Fail, RerankBehavior::Empty] {
            let retriever = retriever(
                FakeIndex::with_matches(director_duties_matches()),
                Some(Arc::new(FakeReranker::new(behavior))),
            );

            let (chunks, sources) = retriever
                .retrieve("director duties", 5, false, true)
                .await
                .unwrap();

            assert_eq!(scores(&sources), vec![0.92, 0.88, 0.85]);
            assert_eq!(chunks.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_rerank_timeout_falls_back() {
        let reranker = FakeReranker::new(RerankBehavior::Stall(Duration::from_secs(5)));
        let retriever = retriever(
            FakeIndex::with_matches(director_duties_matches()),
            Some(Arc::new(reranker)),
        )
        .with_rerank_timeout(Duration::from_millis(20));

        let (_, sources) = retriever
            .retrieve("director duties", 5, false, true)
            .await
            .unwrap();

        assert_eq!(scores(&sources), vec![0.92, 0.88, 0.85]);
    }

    #[tokio::test]
    async fn test_empty_text_and_reference_fallbacks() {
        let matches = vec![
            index_match("blank", 0.95, "   \n", "Section 1"),
            IndexMatch {
                id: "ref".to_string(),
                score: 0.9,
                metadata: metadata(json!({ "text": "Registered office.", "reference": "", "ref": "s. 12" })),
            },
            IndexMatch {
                id: "source".to_string(),
                score: 0.8,
                metadata: metadata(json!({ "text": "Share capital.", "source": "Part V" })),
            },
            IndexMatch {
                id: "none".to_string(),
                score: 0.7,
                metadata: metadata(json!({ "text": "Auditors." })),
            },
        ];
        let retriever = retriever(FakeIndex::with_matches(matches), None);

        let (_, sources) = retriever.retrieve("office", 10, false, false).await.unwrap();

        let refs: Vec<&str> = sources.iter().map(|s| s.reference.as_str()).collect();
        assert_eq!(refs, vec!["s. 12", "Part V", "Unknown"]);
    }

    #[tokio::test]
    async fn test_nothing_relevant_returns_empty_pair() {
        let matches = vec![index_match("low", 0.2, "Unrelated.", "Schedule 1")];
        let reranker = Arc::new(FakeReranker::new(RerankBehavior::Reverse));
        let retriever = retriever(FakeIndex::with_matches(matches), Some(reranker.clone()));

        let (chunks, sources) = retriever.retrieve("director duties", 5, false, true).await.unwrap();
        assert!(chunks.is_empty());
        assert!(sources.is_empty());
        assert_eq!(reranker.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let retriever = retriever(FakeIndex::failing(), None);
        let err = retriever.retrieve("director duties", 5, false, false).await.unwrap_err();
        assert!(matches!(err, LexragError::IndexQuery(_)));
    }

    #[tokio::test]
    async fn test_filter_is_passed_to_index() {
        let index = Arc::new(FakeIndex::with_matches(director_duties_matches()));
        let processor = QueryProcessor::new(Arc::new(FakeEmbedder::default()));
        let filter = json!({ "act": "Companies Act 2015" });
        let retriever =
            Retriever::new(processor, index.clone(), 0.40).with_filter(Some(filter.clone()));

        retriever.retrieve("director duties", 5, false, false).await.unwrap();
        assert_eq!(*index.last_filter.lock().unwrap(), Some(filter));
    }

    #[tokio::test]
    async fn test_repeated_retrieval_is_deterministic() {
        let retriever = retriever(FakeIndex::with_matches(director_duties_matches()), None);

        let first = retriever.retrieve("director duties", 5, false, false).await.unwrap();
        let second = retriever.retrieve("director duties", 5, false, false).await.unwrap();

        assert_eq!(first.0, second.0);
        let refs = |sources: &[RetrievedChunk]| {
            sources.iter().map(|s| s.reference.clone()).collect::<Vec<_>>()
        };
        assert_eq!(refs(&first.1), refs(&second.1));
        assert_eq!(scores(&first.1), scores(&second.1));
    }

    #[tokio::test]
    async fn test_expanded_search_reranks_with_original_query() {
        let embedder = Arc::new(FakeEmbedder::default());
        let generator = Arc::new(FakeGenerator::new("director duties fiduciary obligations"));
        let reranker = Arc::new(FakeReranker::new(RerankBehavior::Reverse));
        let processor = QueryProcessor::new(embedder.clone()).with_generator(generator);
        let retriever = Retriever::new(
            processor,
            Arc::new(FakeIndex::with_matches(director_duties_matches())),
            0.40,
        )
        .with_reranker(Some(reranker.clone()));

        let (_, sources) = retriever
            .retrieve("director duties", 5, true, true)
            .await
            .unwrap();

        assert_eq!(scores(&sources), vec![0.85, 0.88, 0.92]);
        assert_eq!(
            embedder.inputs(),
            vec!["director duties fiduciary obligations".to_string()]
        );
        assert_eq!(
            reranker.last_query.lock().unwrap().as_deref(),
            Some("director duties")
        );
    }

    #[tokio::test]
    async fn test_non_finite_scores_are_dropped() {
        let matches = vec![
            index_match("nan", f32::NAN, "Corrupted vector.", "Section 1"),
            index_match("inf", f32::INFINITY, "Overflowed vector.", "Section 2"),
            index_match("s143", 0.92, "Directors must act within their powers.", "Section 143"),
        ];
        let retriever = retriever(FakeIndex::with_matches(matches), None);

        let (chunks, sources) = retriever.retrieve("director duties", 5, false, false).await.unwrap();

        assert_eq!(chunks, vec!["Directors must act within their powers.".to_string()]);
        assert_eq!(sources[0].reference, "Section 143");
    }
}
