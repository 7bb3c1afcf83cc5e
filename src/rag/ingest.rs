//! Batch ingestion of cleaned records into the vector index.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::store::{IndexedEntry, VectorIndex};
use crate::core::config::settings::DEFAULT_BATCH_SIZE;
use crate::core::deadline::with_deadline;
use crate::core::errors::RagError;
use crate::embedding::EmbeddingProvider;
use crate::records::KnowledgeRecord;

const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub title: String,
    pub reason: String,
    pub retryable: bool,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub total: usize,
    pub indexed: usize,
    /// Records whose embedding had the wrong dimension.
    pub skipped_dimension: usize,
    /// Records whose embedding call failed.
    pub embedding_failures: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Titles from batches that failed to commit.
    pub uncommitted: Vec<String>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.uncommitted.is_empty()
    }
}

pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    embed_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Replaces the whole index with `records` at `dimension`.
    ///
    /// Existing entries are dropped only after the embedder has produced a vector
    /// of the right size for the first record. An empty record set or a failing
    /// embedder leaves the index as it was.
    pub async fn reindex(&self, records: &[KnowledgeRecord], dimension: usize) -> Result<IngestReport, RagError> {
        let Some(first) = records.first() else {
            return Err(RagError::InvalidRecord(
                "refusing to reindex from an empty record set".to_string(),
            ));
        };

        let sample = with_deadline(
            "embedding",
            self.embed_timeout,
            self.embedder.embed(&first.canonical_text()),
        )
        .await?;
        if sample.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: sample.len(),
            });
        }

        tracing::warn!(previous = self.index.dimension(), dimension, "Clearing index for reindex");
        self.index.reset(dimension).await?;
        Ok(self.ingest(records).await)
    }

    /// Embeds and indexes `records`. Per-record problems are reported, never raised.
    pub async fn ingest(&self, records: &[KnowledgeRecord]) -> IngestReport {
        let started = Instant::now();
        let dimension = self.index.dimension();
        let mut report = IngestReport {
            total: records.len(),
            ..IngestReport::default()
        };

        for chunk in records.chunks(self.batch_size) {
            let mut batch = Vec::with_capacity(chunk.len());

            for record in chunk {
                let text = record.canonical_text();
                let embedded = with_deadline(
                    "embedding",
                    self.embed_timeout,
                    self.embedder.embed(&text),
                )
                .await;

                match embedded {
                    Ok(embedding) if embedding.len() == dimension => {
                        batch.push(IndexedEntry::new(record.clone(), embedding));
                    }
                    Ok(embedding) => {
                        tracing::warn!(
                            title = %record.title,
                            expected = dimension,
                            actual = embedding.len(),
                            "Skipping record with mismatched embedding dimension"
                        );
                        report.skipped_dimension += 1;
                        report.skipped.push(SkippedRecord {
                            title: record.title.clone(),
                            reason: RagError::DimensionMismatch {
                                expected: dimension,
                                actual: embedding.len(),
                            }
                            .to_string(),
                            retryable: false,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(title = %record.title, error = %err, "Skipping record that failed to embed");
                        report.embedding_failures += 1;
                        report.skipped.push(SkippedRecord {
                            title: record.title.clone(),
                            reason: err.to_string(),
                            retryable: err.is_retryable(),
                        });
                    }
                }
            }

            if batch.is_empty() {
                continue;
            }

            let titles: Vec<String> = batch.iter().map(|e| e.record.title.clone()).collect();
            match self.index.upsert_batch(batch).await {
                Ok(written) => report.indexed += written,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        count = titles.len(),
                        retryable = err.is_retryable(),
                        "Index batch failed to commit"
                    );
                    report.uncommitted.extend(titles);
                }
            }
        }

        tracing::info!(
            total = report.total,
            indexed = report.indexed,
            skipped_dimension = report.skipped_dimension,
            embedding_failures = report.embedding_failures,
            uncommitted = report.uncommitted.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion finished"
        );
        report
    }
}
