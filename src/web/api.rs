// src/web/api.rs
// REST API handlers

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::syntax::{Classification, classify};
use crate::web::error::ApiResult;
use crate::web::state::{AppState, Upstream};

/// Reply sent whenever the upstream cannot produce one
pub const CHAT_ERROR_MESSAGE: &str = "エラーが発生しました。";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxResponse {
    pub status: Classification,
}

// ═══════════════════════════════════════
// HEALTH
// ═══════════════════════════════════════

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.is_configured()
    }))
}

// ═══════════════════════════════════════
// CHAT RELAY
// ═══════════════════════════════════════

/// Forward one message upstream. Always answers 200; failures are logged
/// and replaced by the fixed error message.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let response = match &state.upstream {
        Upstream::Ready(generator) => match generator.generate(&req.message).await {
            Ok(text) => text,
            Err(e) => {
                error!(upstream = %generator.name(), error = %e, "Chat relay failed");
                CHAT_ERROR_MESSAGE.to_string()
            }
        },
        Upstream::Unconfigured => {
            warn!("Chat request received but no API key is configured");
            CHAT_ERROR_MESSAGE.to_string()
        }
    };

    Json(ChatResponse { response })
}

// ═══════════════════════════════════════
// SYNTAX
// ═══════════════════════════════════════

pub async fn syntax(Json(req): Json<SyntaxRequest>) -> ApiResult<Json<SyntaxResponse>> {
    let status = classify(&req.code)?;
    debug!(status = %status, chars = req.code.len(), "Classified source");
    Ok(Json(SyntaxResponse { status }))
}
