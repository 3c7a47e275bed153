//! Append-only log of answered queries.
//!
//! One JSON object per line in `<data_dir>/logs/queries.jsonl`.

use crate::error::Result;
use crate::rag::AnswerResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const LOG_FILE: &str = "queries.jsonl";

/// Number of source scores kept per entry.
const LOGGED_SCORES: usize = 5;

/// Summary of one answered query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub template: String,
    pub has_context: bool,
    pub num_sources: usize,
    pub source_scores: Vec<f32>,
    pub response_length: usize,
}

impl QueryLogEntry {
    pub fn from_result(result: &AnswerResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            query: result.query.clone(),
            template: result.template_used.clone(),
            has_context: result.has_context,
            num_sources: result.sources.len(),
            source_scores: result
                .sources
                .iter()
                .take(LOGGED_SCORES)
                .map(|s| s.score)
                .collect(),
            response_length: result.answer.chars().count(),
        }
    }
}

/// Writes [`QueryLogEntry`] lines to a file.
pub struct QueryLog {
    path: PathBuf,
}

impl QueryLog {
    /// Log into `log_dir/queries.jsonl`.
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(LOG_FILE),
        }
    }

    /// Append an entry for `result`.
    ///
    /// Write failures are logged and swallowed; a broken log never fails a query.
    pub fn record(&self, result: &AnswerResult) -> Option<Uuid> {
        let entry = QueryLogEntry::from_result(result);
        match self.append(&entry) {
            Ok(()) => {
                debug!("Logged query {} to {}", entry.id, self.path.display());
                Some(entry.id)
            }
            Err(e) => {
                warn!("Failed to write query log {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn append(&self, entry: &QueryLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read back all entries, skipping malformed lines.
    pub fn entries(&self) -> Result<Vec<QueryLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::RetrievedChunk;

    fn result(scores: &[f32]) -> AnswerResult {
        let sources: Vec<RetrievedChunk> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| RetrievedChunk::new(&format!("passage {}", i), "s.1", *s))
            .collect();
        AnswerResult {
            answer: "Directors must act in good faith.".to_string(),
            has_context: !sources.is_empty(),
            template_used: "factual_qa".to_string(),
            context_char_count: None,
            chunks_used: None,
            retrieved_chunks: sources.iter().map(|s| s.text.clone()).collect(),
            formatted_chunks: Vec::new(),
            retrieval_count: sources.len(),
            sources,
            query: "director duties".to_string(),
        }
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = QueryLog::new(&dir.path().join("logs"));

        let first = log.record(&result(&[0.9, 0.8, 0.7, 0.6, 0.5, 0.45])).unwrap();
        log.record(&result(&[])).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[0].num_sources, 6);
        assert_eq!(entries[0].source_scores.len(), 5);
        assert_eq!(entries[0].response_length, 33);
        assert!(!entries[1].has_context);
    }

    #[test]
    fn test_unwritable_log_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        let log = QueryLog::new(&blocker);
        assert!(log.record(&result(&[0.9])).is_none());
    }
}
