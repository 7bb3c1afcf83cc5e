use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{reject_empty, EmbeddingProvider};
use crate::core::config::EmbeddingSettings;
use crate::core::errors::RagError;
use crate::core::http::{build_client, status_error, transport_error, Backend};

/// Embedding client for servers that speak the OpenAI `/embeddings` protocol.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    timeout: Duration,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(settings: &EmbeddingSettings, dimension: Option<usize>) -> Result<Self, RagError> {
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            dimension,
            timeout: settings.timeout,
            client: build_client(Backend::Embedding, settings.timeout)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        reject_empty(text)?;

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|err| transport_error(Backend::Embedding, self.timeout, err))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(Backend::Embedding, status, &text));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|err| RagError::embedding(format!("malformed embedding response: {err}")))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| RagError::embedding("embedding response contained no vector"))
    }
}
