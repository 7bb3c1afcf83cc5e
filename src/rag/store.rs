//! VectorIndex trait: abstract interface for embedding storage backends.
//!
//! The index owns one entry per record title. Its embedding dimension is fixed
//! when the index is created; every write and every query is checked against it.

use async_trait::async_trait;
use serde::Serialize;

use crate::core::errors::RagError;
use crate::records::KnowledgeRecord;

/// A record together with the embedding of its canonical text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedEntry {
    pub record: KnowledgeRecord,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
}

impl IndexedEntry {
    pub fn new(record: KnowledgeRecord, embedding: Vec<f32>) -> Self {
        Self { record, embedding }
    }

    pub fn key(&self) -> &str {
        self.record.key()
    }
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entry: IndexedEntry,
    /// Cosine similarity shifted by +1.0, in [0, 2].
    pub score: f32,
}

pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), RagError> {
    if vector.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Reads may run concurrently; implementations serialize writes internally.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embedding dimension every entry must have.
    fn dimension(&self) -> usize;

    /// Insert or replace the entry keyed by its record title.
    async fn upsert(&self, entry: IndexedEntry) -> Result<(), RagError>;

    /// Insert or replace several entries atomically. Returns the number written.
    async fn upsert_batch(&self, entries: Vec<IndexedEntry>) -> Result<usize, RagError>;

    /// Top `k` entries by shifted cosine score, ties in insertion order.
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError>;

    /// Look up one entry by title.
    async fn get(&self, key: &str) -> Result<Option<IndexedEntry>, RagError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, RagError>;

    /// Drop every entry and adopt a new dimension.
    ///
    /// Used when the embedding model changes and all vectors are invalidated.
    async fn reset(&self, dimension: usize) -> Result<(), RagError>;
}
