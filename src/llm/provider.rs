use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::RagError;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// provider name used in logs (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); returns the assistant message text
    async fn chat(&self, request: ChatRequest) -> Result<String, RagError>;
}
