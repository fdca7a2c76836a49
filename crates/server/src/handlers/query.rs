//! # Query Handler
//!
//! The chat endpoint. It runs the query pipeline for a persona and, when the
//! widget sends a `session_id`, records the exchange for analytics.

use super::{parse_payload, AppError, AppState};
use admitrag::{
    types::{SessionExchange, Trigger},
    DecodedResponse,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// The persona used when a request does not name one.
pub const DEFAULT_PERSONA_ID: &str = "default";

// --- API Payloads ---

#[derive(Deserialize, Debug)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub persona_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Client details (browser, referrer, UTM tags, geo) stored with the session.
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QueryResponse {
    pub response: String,
    pub trigger: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_args: Vec<String>,
}

impl From<DecodedResponse> for QueryResponse {
    fn from(decoded: DecodedResponse) -> Self {
        Self {
            response: decoded.cleaned,
            trigger: decoded.trigger,
            trigger_args: decoded.trigger_args,
        }
    }
}

/// The handler for `POST /api/query`.
pub async fn query_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<QueryResponse>, AppError> {
    let request: QueryRequest = parse_payload(payload)?;
    let query = request.query.as_str();
    if query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty.".to_string()));
    }
    let persona_id = request
        .persona_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PERSONA_ID);
    let session_id = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    info!(persona_id = %persona_id, session = ?session_id, "Received query");

    if let Some(session_id) = session_id {
        if let Err(e) = app_state
            .sessions
            .upsert_session(session_id, persona_id, request.metadata.as_ref())
            .await
        {
            warn!("Failed to upsert session '{session_id}': {e}");
        }
    }

    let decoded = app_state.pipeline.handle(query, persona_id).await?;

    if let Some(session_id) = session_id {
        let exchange = SessionExchange {
            session_id: session_id.to_string(),
            persona_id: persona_id.to_string(),
            query: query.to_string(),
            response: decoded.cleaned.clone(),
            trigger: decoded.trigger,
        };
        if let Err(e) = app_state.sessions.record_exchange(&exchange).await {
            warn!("Failed to record exchange for session '{session_id}': {e}");
        }
    }

    Ok(Json(decoded.into()))
}
