//! Text embedding backends.

mod hash;
mod openai;
mod provider;

use std::sync::Arc;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;
pub use provider::EmbeddingProvider;

use crate::core::config::{EmbeddingProviderKind, RagSettings};
use crate::core::errors::RagError;

/// Builds the embedder selected in config.
pub fn from_settings(settings: &RagSettings) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.embedding.provider {
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(settings.dimension)),
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbedder::new(
            &settings.embedding,
            Some(settings.dimension),
        )?),
    };
    tracing::info!(provider = provider.name(), dimension = settings.dimension, "Embedding provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_build_hash_embedder() {
        let settings = RagSettings::default();
        let provider = from_settings(&settings).expect("provider");
        assert_eq!(provider.name(), "hash");
        assert_eq!(provider.dimension(), Some(settings.dimension));
    }
}
