use async_trait::async_trait;

use crate::core::errors::RagError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "hash", "openai")
    fn name(&self) -> &str;

    /// dimension the provider is configured to emit, if known before the first call
    fn dimension(&self) -> Option<usize>;

    /// embed one text; empty input is a non-retryable `RagError::Embedding`
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

pub(crate) fn reject_empty(text: &str) -> Result<(), RagError> {
    if text.trim().is_empty() {
        return Err(RagError::embedding("cannot embed empty text"));
    }
    Ok(())
}
