//! # Media Handler

use super::{parse_payload, AppError, AppState};
use admitrag::types::MediaAsset;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

#[derive(Deserialize, Debug)]
pub struct MediaMatchRequest {
    /// The media type, e.g. "video" or "slideshow". Matched case-insensitively.
    #[serde(rename = "type")]
    pub media_type: String,
    pub tag: String,
}

/// The handler for `POST /api/media-match`.
///
/// Returns the assets carrying the tag, or the semantically closest assets of
/// the same type when none do and the fallback is enabled.
pub async fn media_match_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Vec<MediaAsset>>, AppError> {
    let request: MediaMatchRequest = parse_payload(payload)?;
    info!(media_type = %request.media_type, tag = %request.tag, "Received media match");
    let assets = app_state
        .media
        .find(&request.media_type, &request.tag)
        .await?;
    Ok(Json(assets))
}
