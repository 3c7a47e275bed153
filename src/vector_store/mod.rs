//! Vector index abstraction for Lexrag.
//!
//! Provides a trait-based interface over nearest-neighbour search backends.
//! Remote indexes (Pinecone) are query-only; local indexes (SQLite, memory)
//! also accept writes through [`IndexWriter`].

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorIndex;

use crate::config::{ProviderSettings, Settings};
use crate::error::{LexragError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Metadata payload stored alongside a vector.
pub type Metadata = serde_json::Map<String, Value>;

/// A single nearest-neighbour match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Record ID.
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Metadata payload, empty when not requested.
    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexMatch {
    /// String value of a metadata field, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A vector with its ID and metadata, as written to a local index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Trait for nearest-neighbour search.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` matches for `vector`, best first.
    ///
    /// `filter` uses Pinecone's metadata filter syntax; local indexes
    /// support field equality, `$eq`, `$ne` and `$in`.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        filter: Option<&Value>,
    ) -> Result<Vec<IndexMatch>>;
}

/// Write access to a local index.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Insert or replace records by ID.
    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// A resolved index: search handle plus write handle for local backends.
pub struct OpenedIndex {
    pub search: Arc<dyn VectorIndex>,
    pub writer: Option<Arc<dyn IndexWriter>>,
}

/// Open the index named by `settings.vector_store.provider`.
pub fn open_index(settings: &Settings) -> Result<OpenedIndex> {
    let store = &settings.vector_store;

    match store.provider.to_lowercase().as_str() {
        "sqlite" => {
            let index = Arc::new(SqliteVectorIndex::new(&settings.sqlite_path())?);
            Ok(OpenedIndex {
                search: index.clone(),
                writer: Some(index),
            })
        }
        "memory" => {
            let index = match &store.memory_path {
                Some(path) => MemoryVectorIndex::load_json(&Settings::expand_path(path))?,
                None => MemoryVectorIndex::new(),
            };
            let index = Arc::new(index);
            Ok(OpenedIndex {
                search: index.clone(),
                writer: Some(index),
            })
        }
        "pinecone" => {
            let host = store.pinecone_host.as_deref().ok_or_else(|| {
                LexragError::Config("vector_store.pinecone_host is required for pinecone".to_string())
            })?;
            let index = PineconeIndex::new(host, &store.namespace, &settings.providers)?;
            Ok(OpenedIndex {
                search: Arc::new(index),
                writer: None,
            })
        }
        other => Err(LexragError::Config(format!("Unknown vector store provider: {}", other))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Evaluate a metadata filter against a record's metadata.
///
/// Every top-level key must match. A plain value means equality; an object
/// may use `$eq`, `$ne` or `$in`. Unknown operators never match.
pub fn matches_filter(metadata: &Metadata, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return true;
    };

    conditions.iter().all(|(key, condition)| {
        let actual = metadata.get(key);
        match condition {
            Value::Object(ops) => ops.iter().all(|(op, expected)| match op.as_str() {
                "$eq" => actual == Some(expected),
                "$ne" => actual != Some(expected),
                "$in" => expected
                    .as_array()
                    .is_some_and(|values| actual.is_some_and(|a| values.contains(a))),
                _ => false,
            }),
            expected => actual == Some(expected),
        }
    })
}

/// Score, filter, rank and truncate records by cosine similarity.
pub(crate) fn rank_records<'a, I>(
    records: I,
    vector: &[f32],
    top_k: usize,
    include_metadata: bool,
    filter: Option<&Value>,
) -> Vec<IndexMatch>
where
    I: IntoIterator<Item = &'a IndexRecord>,
{
    let mut matches: Vec<IndexMatch> = records
        .into_iter()
        .filter(|r| filter.map_or(true, |f| matches_filter(&r.metadata, f)))
        .map(|r| IndexMatch {
            id: r.id.clone(),
            score: cosine_similarity(vector, &r.values),
            metadata: if include_metadata { r.metadata.clone() } else { Metadata::new() },
        })
        .collect();

    // Stable sort keeps insertion order among equal scores
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}

pub(crate) fn provider_timeout(providers: &ProviderSettings) -> Duration {
    Duration::from_secs(providers.timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_matches_filter() {
        let m = meta(json!({ "act": "Companies Act 2015", "section": 143 }));

        assert!(matches_filter(&m, &json!({ "act": "Companies Act 2015" })));
        assert!(matches_filter(&m, &json!({ "section": { "$in": [143, 145] } })));
        assert!(matches_filter(&m, &json!({ "section": { "$ne": 147 } })));
        assert!(!matches_filter(&m, &json!({ "section": { "$eq": 145 } })));
        assert!(!matches_filter(&m, &json!({ "chapter": "IX" })));
        assert!(!matches_filter(&m, &json!({ "section": { "$gt": 100 } })));
    }

    #[test]
    fn test_rank_records_orders_and_truncates() {
        let records = vec![
            IndexRecord { id: "a".into(), values: vec![0.0, 1.0], metadata: meta(json!({ "text": "a" })) },
            IndexRecord { id: "b".into(), values: vec![1.0, 0.0], metadata: meta(json!({ "text": "b" })) },
            IndexRecord { id: "c".into(), values: vec![1.0, 1.0], metadata: meta(json!({ "text": "c" })) },
        ];

        let matches = rank_records(&records, &[1.0, 0.0], 2, false, None);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "b");
        assert_eq!(matches[1].id, "c");
        assert!(matches[0].metadata.is_empty());
    }
}
