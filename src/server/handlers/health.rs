use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::VectorIndex;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let entries = state.index.count().await?;
    Ok(Json(json!({
        "status": "ok",
        "entries": entries,
        "dimension": state.index.dimension(),
        "embedding_provider": state.embedder.name(),
        "started_at": state.started_at.to_rfc3339(),
    })))
}
