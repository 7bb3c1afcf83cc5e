pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

pub use openai::OpenAiChatBackend;
pub use provider::ChatBackend;
pub use types::{ChatMessage, ChatRequest};

use crate::core::config::RagSettings;
use crate::core::errors::RagError;

pub fn from_settings(settings: &RagSettings) -> Result<Arc<dyn ChatBackend>, RagError> {
    let backend = OpenAiChatBackend::new(&settings.generation)?;
    tracing::info!(
        provider = backend.name(),
        model = backend.model(),
        base_url = %settings.generation.base_url,
        "Chat backend ready"
    );
    Ok(Arc::new(backend))
}
