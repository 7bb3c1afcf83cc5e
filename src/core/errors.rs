use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures produced by the retrieval and generation core.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("config conflict: {0}")]
    ConfigConflict(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding failed: {message}")]
    Embedding { message: String, retryable: bool },
    #[error("generation failed: {message}")]
    Generation { message: String, retryable: bool },
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("{operation} timed out after {secs}s")]
    BackendTimeout { operation: &'static str, secs: u64 },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] Box<RagError>),
    #[error("storage error: {0}")]
    Storage(String),
}

impl RagError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::Embedding {
            message: err.to_string(),
            retryable: false,
        }
    }

    pub fn embedding_transient<E: std::fmt::Display>(err: E) -> Self {
        RagError::Embedding {
            message: err.to_string(),
            retryable: true,
        }
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::Generation {
            message: err.to_string(),
            retryable: false,
        }
    }

    pub fn generation_transient<E: std::fmt::Display>(err: E) -> Self {
        RagError::Generation {
            message: err.to_string(),
            retryable: true,
        }
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::IndexUnavailable(_) | RagError::BackendTimeout { .. } => true,
            RagError::Embedding { retryable, .. } | RagError::Generation { retryable, .. } => {
                *retryable
            }
            RagError::Retrieval(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Innermost error, looking through retrieval wrappers.
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::Retrieval(inner) => inner.root_cause(),
            other => other,
        }
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Tls(_) => RagError::IndexUnavailable(err.to_string()),
            sqlx::Error::Database(ref db) if is_busy(db.message()) => {
                RagError::IndexUnavailable(err.to_string())
            }
            other => RagError::Storage(other.to_string()),
        }
    }
}

fn is_busy(message: &str) -> bool {
    message.contains("database is locked") || message.contains("unable to open database")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        match err.root_cause() {
            RagError::InvalidQuery(_) | RagError::InvalidRecord(_) => ApiError::BadRequest(message),
            RagError::IndexUnavailable(_) | RagError::BackendTimeout { .. } => {
                ApiError::ServiceUnavailable(message)
            }
            RagError::Embedding { retryable, .. } | RagError::Generation { retryable, .. } => {
                if *retryable {
                    ApiError::ServiceUnavailable(message)
                } else {
                    ApiError::BadGateway(message)
                }
            }
            _ => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, retryable) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), false),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone(), true),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), false),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), false),
        };

        let body = Json(json!({ "error": message, "retryable": retryable }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_wrapper_keeps_inner_retryability() {
        let timeout = RagError::Retrieval(Box::new(RagError::BackendTimeout {
            operation: "embedding",
            secs: 3,
        }));
        assert!(timeout.is_retryable());

        let bad_input = RagError::Retrieval(Box::new(RagError::embedding("empty input")));
        assert!(!bad_input.is_retryable());
    }

    #[test]
    fn data_errors_are_not_retryable() {
        assert!(!RagError::InvalidQuery("empty".into()).is_retryable());
        assert!(!RagError::DimensionMismatch { expected: 4, actual: 3 }.is_retryable());
        assert!(!RagError::ConfigConflict("dims".into()).is_retryable());
        assert!(RagError::IndexUnavailable("down".into()).is_retryable());
    }

    #[test]
    fn api_error_maps_from_root_cause() {
        let err = RagError::Retrieval(Box::new(RagError::IndexUnavailable("gone".into())));
        assert!(matches!(ApiError::from(err), ApiError::ServiceUnavailable(_)));

        let err = RagError::InvalidQuery("empty".into());
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));

        let err = RagError::generation("no content");
        assert!(matches!(ApiError::from(err), ApiError::BadGateway(_)));
    }
}
