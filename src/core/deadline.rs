use std::future::Future;
use std::time::Duration;

use crate::core::errors::RagError;

/// Waits for a backend call for at most `limit`. The call itself is dropped, not cancelled remotely.
pub async fn with_deadline<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, RagError>
where
    F: Future<Output = Result<T, RagError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_secs = limit.as_secs(), "Backend call timed out");
            Err(RagError::BackendTimeout {
                operation,
                secs: limit.as_secs(),
            })
        }
    }
}
