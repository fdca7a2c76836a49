//! # Classes Handler

use super::{AppError, AppState};
use admitrag::types::UpcomingClass;
use axum::{extract::State, Json};
use chrono::Local;

/// The handler for `GET /api/upcoming-classes`.
///
/// Lists classes starting today or later (server local date), earliest first.
pub async fn upcoming_classes_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<UpcomingClass>>, AppError> {
    let today = Local::now().date_naive();
    let classes = app_state.classes.upcoming_classes(today).await?;
    Ok(Json(classes))
}
