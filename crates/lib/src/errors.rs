use thiserror::Error;

/// Errors raised by the external collaborators (AI providers and storage backends).
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("Storage connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

impl From<turso::Error> for PromptError {
    fn from(err: turso::Error) -> Self {
        PromptError::StorageOperationFailed(err.to_string())
    }
}

/// The failure taxonomy of a single query-pipeline run.
///
/// Every variant is terminal: the pipeline never returns a partially built response.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No data found for persona '{0}'.")]
    PersonaNotFound(String),
    #[error("Failed to embed the query: {0}")]
    EmbeddingFailed(String),
    #[error("No relevant content found in training data.")]
    NoContextFound,
    #[error("Chat completion failed: {0}")]
    CompletionFailed(String),
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Errors raised while matching media assets.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media type must not be empty")]
    EmptyMediaType,
    #[error("Media store failed: {0}")]
    Store(PromptError),
    #[error("Failed to embed the media query: {0}")]
    Embedding(PromptError),
}

/// Errors that abort an embedding backfill run.
///
/// Per-row failures are counted in the report instead.
#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("Failed to fetch rows missing an embedding: {0}")]
    Fetch(#[from] PromptError),
}
