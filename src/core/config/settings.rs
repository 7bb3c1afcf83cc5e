//! Typed view over the merged YAML config, with defaults for every field.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

pub const DEFAULT_DIMENSION: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_TURNS: usize = 200;

const DEFAULT_GENERATION_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
const DEFAULT_GENERATION_MODEL: &str = "glm-4-flash";
const DEFAULT_EMBEDDING_URL: &str = "http://127.0.0.1:8000/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "GanymedeNil/text2vec-large-chinese";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    /// Offline feature-hashing embedder.
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub dimension: usize,
    pub index_path: Option<PathBuf>,
    pub batch_size: usize,
    pub top_k: usize,
    pub max_turns: usize,
    pub host: String,
    pub port: u16,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self::from_value(&Value::Null)
    }
}

impl RagSettings {
    /// Reads a config tree that already passed `validate_config`.
    pub fn from_value(config: &Value) -> Self {
        let section = |name: &str| config.get(name).cloned().unwrap_or(Value::Null);
        let index = section("index");
        let ingest = section("ingest");
        let retrieval = section("retrieval");
        let embedding = section("embedding");
        let generation = section("generation");
        let session = section("session");
        let server = section("server");

        let provider = match str_field(&embedding, "provider").as_deref() {
            Some("openai") => EmbeddingProviderKind::OpenAi,
            _ => EmbeddingProviderKind::Hash,
        };

        Self {
            dimension: u64_field(&index, "dimension")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_DIMENSION),
            index_path: str_field(&index, "path").map(PathBuf::from),
            batch_size: u64_field(&ingest, "batch_size")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .max(1),
            top_k: u64_field(&retrieval, "top_k")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_TOP_K),
            max_turns: u64_field(&session, "max_turns")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_MAX_TURNS),
            host: str_field(&server, "host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: u64_field(&server, "port").map(|v| v as u16).unwrap_or(0),
            embedding: EmbeddingSettings {
                provider,
                base_url: str_field(&embedding, "base_url")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_URL.to_string()),
                model: str_field(&embedding, "model")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                api_key: str_field(&embedding, "api_key").filter(|k| !k.is_empty()),
                timeout: Duration::from_secs(u64_field(&embedding, "timeout_secs").unwrap_or(30)),
            },
            generation: GenerationSettings {
                base_url: str_field(&generation, "base_url")
                    .unwrap_or_else(|| DEFAULT_GENERATION_URL.to_string()),
                model: str_field(&generation, "model")
                    .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
                api_key: str_field(&generation, "api_key").filter(|k| !k.is_empty()),
                system_prompt: str_field(&generation, "system_prompt"),
                timeout: Duration::from_secs(
                    u64_field(&generation, "timeout_secs").unwrap_or(60),
                ),
                max_tokens: u64_field(&generation, "max_tokens").map(|v| v as u32),
                temperature: generation.get("temperature").and_then(|v| v.as_f64()),
            },
        }
    }

    /// API keys may come from the environment instead of `secrets.yaml`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("POLICY_RAG_GENERATION_API_KEY") {
            if !key.is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        if let Ok(key) = env::var("POLICY_RAG_EMBEDDING_API_KEY") {
            if !key.is_empty() {
                self.embedding.api_key = Some(key);
            }
        }
    }
}

fn u64_field(section: &Value, key: &str) -> Option<u64> {
    section.get(key).and_then(|v| v.as_u64())
}

fn str_field(section: &Value, key: &str) -> Option<String> {
    section
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_original_deployment() {
        let settings = RagSettings::default();
        assert_eq!(settings.dimension, 1024);
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.generation.model, "glm-4-flash");
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Hash);
        assert!(settings.generation.api_key.is_none());
    }

    #[test]
    fn reads_sections() {
        let settings = RagSettings::from_value(&json!({
            "index": { "dimension": 768, "path": "/tmp/idx.db" },
            "ingest": { "batch_size": 10 },
            "retrieval": { "top_k": 3 },
            "embedding": { "provider": "openai", "timeout_secs": 5 },
            "generation": { "api_key": "", "temperature": 0.1 },
            "session": { "max_turns": 0 }
        }));

        assert_eq!(settings.dimension, 768);
        assert_eq!(settings.index_path, Some(PathBuf::from("/tmp/idx.db")));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::OpenAi);
        assert_eq!(settings.embedding.timeout, Duration::from_secs(5));
        assert!(settings.generation.api_key.is_none());
        assert_eq!(settings.generation.temperature, Some(0.1));
        assert_eq!(settings.max_turns, 0);
    }
}
