use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::ChatBackend;
use super::types::ChatRequest;
use crate::core::config::GenerationSettings;
use crate::core::errors::RagError;
use crate::core::http::{build_client, status_error, transport_error, Backend};

/// Chat client for OpenAI-compatible `/chat/completions` endpoints (Zhipu GLM, LM Studio, vLLM).
#[derive(Clone)]
pub struct OpenAiChatBackend {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl OpenAiChatBackend {
    pub fn new(settings: &GenerationSettings) -> Result<Self, RagError> {
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
            client: build_client(Backend::Generation, settings.timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn request_body(model: &str, request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }
    body
}

fn extract_content(payload: &Value) -> Option<&str> {
    payload["choices"][0]["message"]["content"].as_str()
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, RagError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = request_body(&self.model, &request);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder
            .send()
            .await
            .map_err(|err| transport_error(Backend::Generation, self.timeout, err))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(Backend::Generation, status, &text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| RagError::generation(format!("malformed chat response: {err}")))?;

        extract_content(&payload)
            .map(|content| content.to_string())
            .ok_or_else(|| RagError::generation("chat response contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn body_includes_sampling_only_when_set() {
        let request = ChatRequest::new(vec![ChatMessage::user("你好")]);
        let body = request_body("glm-4-flash", &request);
        assert_eq!(body["model"], "glm-4-flash");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("temperature").is_none());

        let body = request_body("glm-4-flash", &request.with_sampling(Some(0.3), Some(512)));
        assert_eq!(body["temperature"], json!(0.3));
        assert_eq!(body["max_tokens"], json!(512));
    }

    #[test]
    fn content_is_read_from_first_choice() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "回答"}}]
        });
        assert_eq!(extract_content(&payload), Some("回答"));
        assert_eq!(extract_content(&json!({"choices": []})), None);
    }
}
