use serde_json::{Map, Value};

use crate::core::errors::RagError;

const EMBEDDING_PROVIDERS: [&str; 2] = ["hash", "openai"];
const GENERATION_PROVIDERS: [&str; 1] = ["openai"];

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_u64_field(index, "index.dimension", "dimension", 1, 65_536)?;
        validate_optional_string_field(index, "index.path", "path")?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.batch_size", "batch_size", 1, 10_000)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 0, 100)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_choice_field(
            embedding,
            "embedding.provider",
            "provider",
            &EMBEDDING_PROVIDERS,
        )?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_choice_field(
            generation,
            "generation.provider",
            "provider",
            &GENERATION_PROVIDERS,
        )?;
        validate_optional_string_field(generation, "generation.base_url", "base_url")?;
        validate_optional_string_field(generation, "generation.model", "model")?;
        validate_optional_string_field(generation, "generation.api_key", "api_key")?;
        validate_optional_string_field(
            generation,
            "generation.system_prompt",
            "system_prompt",
        )?;
        validate_u64_field(generation, "generation.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(generation, "generation.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_f64_field(generation, "generation.temperature", "temperature", 0.0, 2.0)?;
    }

    if let Some(session) = expect_optional_object(root, "session")? {
        validate_u64_field(session, "session.max_turns", "max_turns", 0, 100_000)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "invalid value at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "invalid value at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_choice_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(RagError::Config(format!(
            "invalid value at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!("invalid value at '{}': expected {}", path, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_full_config() {
        let config = json!({
            "index": { "dimension": 1024, "path": "index.db" },
            "ingest": { "batch_size": 50 },
            "retrieval": { "top_k": 5 },
            "embedding": { "provider": "openai", "model": "text2vec", "timeout_secs": 30 },
            "generation": { "provider": "openai", "model": "glm-4-flash", "temperature": 0.3 },
            "session": { "max_turns": 0 },
            "server": { "host": "127.0.0.1", "port": 8080 }
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_zero_dimension() {
        let config = json!({ "index": { "dimension": 0 } });
        let err = validate_config(&config).expect_err("zero dimension");
        assert!(err.to_string().contains("index.dimension"));
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = json!({ "embedding": { "provider": "elastic" } });
        let err = validate_config(&config).expect_err("unknown provider");
        assert!(err.to_string().contains("embedding.provider"));
    }

    #[test]
    fn rejects_non_object_sections() {
        let config = json!({ "ingest": 50 });
        assert!(matches!(validate_config(&config), Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_string_batch_size() {
        let config = json!({ "ingest": { "batch_size": "fifty" } });
        assert!(validate_config(&config).is_err());
    }
}
