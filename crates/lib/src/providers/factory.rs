//! # AI Provider Factory
//!
//! Centralizes how a chat provider is instantiated from configuration so that the
//! server and the command-line tools resolve providers the same way.

use crate::{
    errors::PromptError,
    providers::ai::{gemini::GeminiProvider, openai::OpenAiProvider, AiProvider},
    types::ProviderConfig,
};
use tracing::info;

/// Creates a chat provider from its configuration.
///
/// - `openai` (alias `local`): any OpenAI-compatible chat-completions endpoint;
///   `api_url` defaults to the public OpenAI endpoint.
/// - `gemini`: requires `api_key`; `api_url` is derived from the model when absent.
pub fn create_ai_provider(config: &ProviderConfig) -> Result<Box<dyn AiProvider>, PromptError> {
    let provider: Box<dyn AiProvider> = match config.provider.as_str() {
        "openai" | "local" => {
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| OpenAiProvider::DEFAULT_API_URL.to_string());
            info!(
                api_url = %api_url,
                model = %config.model_name,
                "Configuring OpenAI-compatible chat provider"
            );
            Box::new(OpenAiProvider::new(
                api_url,
                config.api_key.clone(),
                Some(config.model_name.clone()),
            )?)
        }
        "gemini" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                PromptError::MissingCollaborator("api_key is required for the gemini provider")
            })?;
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| GeminiProvider::url_for_model(&config.model_name));
            info!(api_url = %api_url, "Configuring Gemini chat provider");
            Box::new(GeminiProvider::new(api_url, api_key)?)
        }
        other => return Err(PromptError::UnsupportedProvider(other.to_string())),
    };
    Ok(provider)
}
