//! SQLite-based vector index implementation.
//!
//! Uses SQLite for storage with cosine similarity computed in Rust. Every
//! search scans the whole table, which is fine for a single statute or a
//! few thousand chunks. Larger corpora belong in a hosted index.

use super::{rank_records, IndexMatch, IndexRecord, IndexWriter, Metadata, VectorIndex};
use crate::error::{LexragError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
        id TEXT PRIMARY KEY,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_records_indexed_at ON records(indexed_at);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) an index at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LexragError::IndexQuery(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Read every stored record.
    fn load_records(conn: &Connection) -> Result<Vec<IndexRecord>> {
        let mut stmt = conn.prepare("SELECT id, embedding, metadata FROM records ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            let metadata_json: String = row.get(2)?;
            Ok((id, embedding_bytes, metadata_json))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, embedding_bytes, metadata_json) = row?;
            let metadata: Metadata = match serde_json::from_str(&metadata_json) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping record {} with unreadable metadata: {}", id, e);
                    continue;
                }
            };
            records.push(IndexRecord {
                id,
                values: Self::bytes_to_embedding(&embedding_bytes),
                metadata,
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, vector, filter))]
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        filter: Option<&Value>,
    ) -> Result<Vec<IndexMatch>> {
        let records = {
            let conn = self.lock()?;
            Self::load_records(&conn).map_err(|e| LexragError::IndexQuery(e.to_string()))?
        };

        let matches = rank_records(&records, vector, top_k, include_metadata, filter);
        debug!("Found {} matching records", matches.len());
        Ok(matches)
    }
}

#[async_trait]
impl IndexWriter for SqliteVectorIndex {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_batch(&self, records: &[IndexRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO records (id, embedding, metadata, indexed_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    record.id,
                    Self::embedding_to_bytes(&record.values),
                    serde_json::to_string(&record.metadata)?,
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} records", records.len());
        Ok(records.len())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, values: Vec<f32>, text: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            values,
            metadata: json!({ "text": text, "reference": id }).as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_vector_index() {
        let index = SqliteVectorIndex::in_memory().unwrap();

        index
            .upsert_batch(&[
                record("s143", vec![1.0, 0.0, 0.0], "Act within powers"),
                record("s147", vec![0.0, 0.0, 1.0], "Reasonable care"),
            ])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        let results = index.search(&[1.0, 0.0, 0.0], 10, true, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "s143");
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].metadata_str("reference"), Some("s143"));

        let filter = json!({ "reference": "s147" });
        let results = index.search(&[1.0, 0.0, 0.0], 10, false, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "s147");
        assert!(results[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");

        {
            let index = SqliteVectorIndex::new(&path).unwrap();
            index.upsert_batch(&[record("a", vec![0.6, 0.8], "text")]).await.unwrap();
        }

        let reopened = SqliteVectorIndex::new(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        let results = reopened.search(&[0.6, 0.8], 1, true, None).await.unwrap();
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_embedding_roundtrip_bytes() {
        let bytes = SqliteVectorIndex::embedding_to_bytes(&[0.25, -1.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(SqliteVectorIndex::bytes_to_embedding(&bytes), vec![0.25, -1.5]);
    }
}
