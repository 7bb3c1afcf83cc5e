//! Shared plumbing for the HTTP-backed embedding and generation providers.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Embedding,
    Generation,
}

impl Backend {
    pub fn operation(self) -> &'static str {
        match self {
            Backend::Embedding => "embedding",
            Backend::Generation => "generation",
        }
    }

    fn error(self, message: String, retryable: bool) -> RagError {
        match self {
            Backend::Embedding => RagError::Embedding { message, retryable },
            Backend::Generation => RagError::Generation { message, retryable },
        }
    }
}

pub fn build_client(backend: Backend, timeout: Duration) -> Result<Client, RagError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| backend.error(format!("failed to build HTTP client: {err}"), false))
}

/// Timeouts and connection failures are retryable; malformed requests are not.
pub fn transport_error(backend: Backend, timeout: Duration, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        return RagError::BackendTimeout {
            operation: backend.operation(),
            secs: timeout.as_secs(),
        };
    }
    let retryable = err.is_connect() || err.is_request();
    backend.error(format!("{} backend unreachable: {err}", backend.operation()), retryable)
}

/// Server-side failures and throttling are retryable; other statuses are not.
pub fn status_error(backend: Backend, status: StatusCode, body: &str) -> RagError {
    let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
    let snippet: String = body.chars().take(300).collect();
    backend.error(
        format!("{} backend returned {status}: {snippet}", backend.operation()),
        retryable,
    )
}
