use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::{GroundedAnswer, SearchHit};
use crate::state::AppState;

const MAX_K: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    /// Negative values are treated as zero.
    pub k: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HitView {
    pub title: String,
    pub time: String,
    pub source: String,
    pub content: String,
    pub score: f32,
}

impl From<SearchHit> for HitView {
    fn from(hit: SearchHit) -> Self {
        let record = hit.entry.record;
        Self {
            title: record.title,
            time: record.timestamp,
            source: record.source,
            content: record.content,
            score: hit.score,
        }
    }
}

fn answer_body(grounded: GroundedAnswer) -> serde_json::Value {
    let sources: Vec<HitView> = grounded.sources.into_iter().map(HitView::from).collect();
    json!({
        "answer": grounded.answer,
        "sources": sources,
    })
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RetrieveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let k = payload
        .k
        .map(|k| k.clamp(0, MAX_K) as usize)
        .unwrap_or(state.settings.top_k);

    let hits = state.assistant.retrieve(&payload.query, k).await?;
    let hits: Vec<HitView> = hits.into_iter().map(HitView::from).collect();
    Ok(Json(json!({ "hits": hits })))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grounded = state.assistant.generate(&payload.query).await?;
    Ok(Json(answer_body(grounded)))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grounded = state.assistant.ask(&payload.query).await?;
    let mut body = answer_body(grounded);
    body["session_id"] = json!(state.assistant.session_id().await);
    Ok(Json(body))
}

pub async fn transcript(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let assistant = &state.assistant;
    Ok(Json(json!({
        "session_id": assistant.session_id().await,
        "turns": assistant.transcript().await,
        "evicted": assistant.evicted_turns().await,
        "text": assistant.render_transcript().await,
    })))
}
