//! In-memory vector index implementation.
//!
//! Useful for testing and small datasets. Can be seeded from a JSON file
//! holding an array of `{ "id", "values", "metadata" }` records.

use super::{rank_records, IndexMatch, IndexRecord, IndexWriter, VectorIndex};
use crate::error::{LexragError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl MemoryVectorIndex {
    /// Create an empty in-memory index.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Create an index holding `records`, in the given order.
    pub fn with_records(records: Vec<IndexRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load records from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<IndexRecord> = serde_json::from_str(&content)?;
        info!("Loaded {} records into memory index from {:?}", records.len(), path);
        Ok(Self::with_records(records))
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> LexragError {
        LexragError::IndexQuery(format!("Failed to acquire lock: {}", e))
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        filter: Option<&Value>,
    ) -> Result<Vec<IndexMatch>> {
        let records = self.records.read().map_err(Self::lock_error)?;
        Ok(rank_records(records.iter(), vector, top_k, include_metadata, filter))
    }
}

#[async_trait]
impl IndexWriter for MemoryVectorIndex {
    async fn upsert_batch(&self, batch: &[IndexRecord]) -> Result<usize> {
        let mut records = self.records.write().map_err(Self::lock_error)?;
        for record in batch {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        Ok(batch.len())
    }

    async fn count(&self) -> Result<usize> {
        let records = self.records.read().map_err(Self::lock_error)?;
        Ok(records.len())
    }
}
