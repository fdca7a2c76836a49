//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for `admitrag-server`.
//! The handlers are split into sub-modules by endpoint family.

pub mod classes;
pub mod general;
pub mod media;
pub mod query;
pub mod sessions;

// Re-export all handlers so the router reaches them under a single `handlers::` path.
pub use classes::*;
pub use general::*;
pub use media::*;
pub use query::*;
pub use sessions::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserializes a JSON body, turning shape errors into a 400.
fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}
