use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::context_builder::{build_messages, DEFAULT_SYSTEM_PROMPT};
use super::retriever::Retriever;
use super::store::SearchHit;
use crate::core::config::GenerationSettings;
use crate::core::config::settings::DEFAULT_TOP_K;
use crate::core::deadline::with_deadline;
use crate::core::errors::RagError;
use crate::llm::{ChatBackend, ChatRequest};

/// A generated answer together with the records it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub sources: Vec<SearchHit>,
}

pub struct AnswerGenerator {
    retriever: Arc<Retriever>,
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
    top_k: usize,
    timeout: Duration,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl AnswerGenerator {
    pub fn new(retriever: Arc<Retriever>, backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self {
            retriever,
            backend,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            top_k: DEFAULT_TOP_K,
            timeout,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_settings(
        retriever: Arc<Retriever>,
        backend: Arc<dyn ChatBackend>,
        settings: &GenerationSettings,
        top_k: usize,
    ) -> Self {
        let mut generator = Self::new(retriever, backend, settings.timeout).with_top_k(top_k);
        if let Some(prompt) = settings.system_prompt.as_ref().filter(|p| !p.trim().is_empty()) {
            generator.system_prompt = prompt.clone();
        }
        generator.temperature = settings.temperature;
        generator.max_tokens = settings.max_tokens;
        generator
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn generate(&self, query: &str) -> Result<String, RagError> {
        Ok(self.answer(query).await?.answer)
    }

    /// Retrieves, prompts and calls the backend. Retrieval errors are returned as is.
    pub async fn answer(&self, query: &str) -> Result<GroundedAnswer, RagError> {
        let sources = self.retriever.retrieve(query, self.top_k).await?;
        if sources.is_empty() {
            tracing::info!("No policy context found; answering with empty context");
        }

        let request = ChatRequest::new(build_messages(&self.system_prompt, &sources, query))
            .with_sampling(self.temperature, self.max_tokens);

        let answer = match self.call_backend(request.clone()).await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(backend = self.backend.name(), error = %err, "Generation failed, retrying once");
                self.call_backend(request).await?
            }
            other => other?,
        };

        Ok(GroundedAnswer { answer, sources })
    }

    async fn call_backend(&self, request: ChatRequest) -> Result<String, RagError> {
        let content = with_deadline("generation", self.timeout, self.backend.chat(request)).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(RagError::generation("backend returned empty content"));
        }
        Ok(content.to_string())
    }
}
