//! # Embeddings Provider
//!
//! Turns text into a vector by calling an external embeddings API. Two wire
//! formats are supported: the OpenAI `model`/`input` shape, used by OpenAI and
//! most self-hosted servers, and Gemini's `embedContent` shape. The format is
//! picked once from the endpoint URL.

use crate::{errors::PromptError, providers::ai::EmbeddingProvider};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GeminiEmbeddingRequest<'a> {
    model: &'a str,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiEmbeddingResponse {
    embedding: GeminiValues,
}

#[derive(Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

/// The request/response dialect spoken by an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EmbeddingApi {
    OpenAi,
    Gemini,
}

impl EmbeddingApi {
    fn for_url(api_url: &str) -> Self {
        if api_url.contains("generativelanguage.googleapis.com") {
            EmbeddingApi::Gemini
        } else {
            EmbeddingApi::OpenAi
        }
    }
}

/// An [`EmbeddingProvider`] backed by an HTTP embeddings endpoint.
#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    client: ReqwestClient,
    api_url: String,
    /// For Gemini, always carries the `models/` prefix.
    model: String,
    api_key: Option<String>,
    api: EmbeddingApi,
}

impl HttpEmbeddingProvider {
    /// The public OpenAI embeddings endpoint.
    pub const DEFAULT_API_URL: &'static str = "https://api.openai.com/v1/embeddings";

    pub fn new(
        api_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        let api = EmbeddingApi::for_url(&api_url);
        let model = match api {
            EmbeddingApi::Gemini if !model.starts_with("models/") => format!("models/{model}"),
            _ => model,
        };
        Ok(Self {
            client,
            api_url,
            model,
            api_key,
            api,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, input: &str) -> RequestBuilder {
        let builder = self.client.post(&self.api_url);
        match (self.api, self.api_key.as_deref()) {
            (EmbeddingApi::OpenAi, key) => {
                let builder = builder.json(&OpenAiEmbeddingRequest {
                    model: &self.model,
                    input,
                });
                match key {
                    Some(key) => builder.bearer_auth(key),
                    None => builder,
                }
            }
            (EmbeddingApi::Gemini, key) => {
                let builder = builder.json(&GeminiEmbeddingRequest {
                    model: &self.model,
                    content: GeminiContent {
                        parts: [GeminiPart { text: input }],
                    },
                });
                match key {
                    Some(key) => builder.header("x-goog-api-key", key),
                    None => builder,
                }
            }
        }
    }

    async fn parse(&self, response: Response) -> Result<Vec<f32>, PromptError> {
        match self.api {
            EmbeddingApi::OpenAi => {
                let body: OpenAiEmbeddingResponse = response
                    .json()
                    .await
                    .map_err(PromptError::AiDeserialization)?;
                body.data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| PromptError::AiApi("no embeddings in response".to_string()))
            }
            EmbeddingApi::Gemini => {
                let body: GeminiEmbeddingResponse = response
                    .json()
                    .await
                    .map_err(PromptError::AiDeserialization)?;
                Ok(body.embedding.values)
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, PromptError> {
        debug!(api = ?self.api, model = %self.model, "--> Requesting embedding");
        let response = self
            .request(input)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi(format!("{status}: {error_text}")));
        }

        let vector = self.parse(response).await?;
        if vector.is_empty() {
            return Err(PromptError::AiApi(
                "embeddings API returned an empty vector".to_string(),
            ));
        }
        debug!(dimensions = vector.len(), "<-- Embedding received");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_is_picked_from_url() {
        assert_eq!(
            EmbeddingApi::for_url("https://api.openai.com/v1/embeddings"),
            EmbeddingApi::OpenAi
        );
        assert_eq!(
            EmbeddingApi::for_url(
                "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
            ),
            EmbeddingApi::Gemini
        );
    }

    #[test]
    fn test_gemini_model_gets_models_prefix() {
        let provider = HttpEmbeddingProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
                .to_string(),
            "text-embedding-004".to_string(),
            None,
        )
        .unwrap();
        assert_eq!(provider.model(), "models/text-embedding-004");

        let provider =
            HttpEmbeddingProvider::new("http://localhost:8080".to_string(), "m".to_string(), None)
                .unwrap();
        assert_eq!(provider.model(), "m");
    }
}
