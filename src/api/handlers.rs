//! HTTP handlers for the health and one-shot relay endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::state::AppState;

/// Health/status response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_connections: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_connections: state.registry.active_count(),
    })
}

/// One-shot relay request. A missing `message` field is treated as an empty
/// query, mirroring the WebSocket fallback behavior.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub length: usize,
}

/// POST /chat
///
/// Single request/response alternative to the WebSocket endpoint.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let answer = state.generator.generate(&request.message).await?;
    let length = answer.char_len();
    Ok(Json(ChatResponse {
        reply: answer.into_text(),
        length,
    }))
}
