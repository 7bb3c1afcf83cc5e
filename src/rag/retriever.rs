use std::sync::Arc;
use std::time::Duration;

use super::store::{SearchHit, VectorIndex};
use crate::core::deadline::with_deadline;
use crate::core::errors::RagError;
use crate::embedding::EmbeddingProvider;

/// Embeds a query and searches the shared index. Safe to call concurrently.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            index,
            embedder,
            embed_timeout,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Top `k` records for `query`.
    ///
    /// Blank queries fail with `InvalidQuery` before any backend call; `k == 0`
    /// yields no hits. Backend and index failures come back wrapped in `Retrieval`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidQuery("query text is empty".to_string()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = with_deadline("embedding", self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|err| RagError::Retrieval(Box::new(err)))?;

        let hits = self
            .index
            .search(&embedding, k)
            .await
            .map_err(|err| RagError::Retrieval(Box::new(err)))?;

        tracing::debug!(k, hits = hits.len(), top_score = hits.first().map(|h| h.score), "Retrieved");
        Ok(hits)
    }
}
