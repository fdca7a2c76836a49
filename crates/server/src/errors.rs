use admitrag::{MediaError, PipelineError, PromptError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates the different kinds of errors that can occur within the
/// server, allowing them to be converted into appropriate HTTP responses. Every
/// response body has the shape `{"error": message}`.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the query pipeline.
    Pipeline(PipelineError),
    /// Errors from media matching.
    Media(MediaError),
    /// Errors from a storage or AI collaborator called directly by a handler.
    Prompt(PromptError),
    /// A malformed request payload.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err)
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        AppError::Prompt(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Pipeline(err) => {
                error!("PipelineError: {:?}", err);
                let status = match err {
                    PipelineError::PersonaNotFound(_) => StatusCode::NOT_FOUND,
                    PipelineError::NoContextFound => StatusCode::UNPROCESSABLE_ENTITY,
                    PipelineError::EmbeddingFailed(_)
                    | PipelineError::CompletionFailed(_)
                    | PipelineError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
                };
                (status, err.to_string())
            }
            AppError::Media(err) => {
                error!("MediaError: {:?}", err);
                let status = match err {
                    MediaError::EmptyMediaType => StatusCode::BAD_REQUEST,
                    MediaError::Store(_) | MediaError::Embedding(_) => StatusCode::BAD_GATEWAY,
                };
                (status, err.to_string())
            }
            AppError::Prompt(err) => {
                error!("PromptError: {:?}", err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            AppError::BadRequest(message) => {
                error!("Bad request: {message}");
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
