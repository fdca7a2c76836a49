//! # Session Analytics Handlers
//!
//! Batches of clicks and pointer movements sent by the chat widget.

use super::{parse_payload, AppError, AppState};
use admitrag::types::{ClickEvent, MoveEvent};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Deserialize, Debug)]
pub struct ClicksRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub clicks: Option<Vec<ClickEvent>>,
}

#[derive(Deserialize, Debug)]
pub struct MovesRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub moves: Option<Vec<MoveEvent>>,
}

/// Acknowledges a stored batch.
#[derive(Serialize, Deserialize, Debug)]
pub struct BatchResponse {
    pub status: String,
    pub count: usize,
}

impl BatchResponse {
    fn ok(count: usize) -> Self {
        Self {
            status: "ok".to_string(),
            count,
        }
    }
}

fn require_session(session_id: Option<String>) -> Result<String, AppError> {
    session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing session_id.".to_string()))
}

/// The handler for `POST /api/session-clicks`.
pub async fn session_clicks_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<BatchResponse>, AppError> {
    let request: ClicksRequest = parse_payload(payload)?;
    let session_id = require_session(request.session_id)?;
    let clicks = request
        .clicks
        .ok_or_else(|| AppError::BadRequest("Missing clicks array.".to_string()))?;

    let count = app_state.sessions.record_clicks(&session_id, &clicks).await?;
    info!(session = %session_id, count, "Stored session clicks");
    Ok(Json(BatchResponse::ok(count)))
}

/// The handler for `POST /api/session-move`.
pub async fn session_move_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<BatchResponse>, AppError> {
    let request: MovesRequest = parse_payload(payload)?;
    let session_id = require_session(request.session_id)?;
    let moves = request
        .moves
        .ok_or_else(|| AppError::BadRequest("Missing moves array.".to_string()))?;

    let count = app_state.sessions.record_moves(&session_id, &moves).await?;
    info!(session = %session_id, count, "Stored session moves");
    Ok(Json(BatchResponse::ok(count)))
}
