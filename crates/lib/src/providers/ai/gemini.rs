use crate::{
    errors::PromptError,
    providers::ai::AiProvider,
    types::{ChatMessage, Role},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt::Debug};
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Turn<'a>>,
    contents: Vec<Turn<'a>>,
}

#[derive(Serialize)]
struct Turn<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: Cow<'a, str>,
}

#[derive(Deserialize)]
struct GenerateContentReply {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
}

#[derive(Deserialize)]
struct ReplyCandidate {
    content: ReplyContent,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: String,
}

/// Chat completion against Google's `generateContent` endpoint.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_url: String, api_key: String) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    /// Builds the `generateContent` URL for a model name.
    pub fn url_for_model(model_name: &str) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model_name}:generateContent"
        )
    }
}

fn text(value: &str) -> TextPart<'_> {
    TextPart {
        text: value.into(),
    }
}

impl<'a> GenerateContentBody<'a> {
    /// System messages travel out of band; the assistant role is called "model".
    fn from_messages(messages: &'a [ChatMessage]) -> Self {
        let (system, dialogue): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
            messages.iter().partition(|m| m.role == Role::System);

        let system_instruction = (!system.is_empty()).then(|| {
            let joined = system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            Turn {
                role: None,
                parts: vec![TextPart {
                    text: joined.into(),
                }],
            }
        });

        let contents = dialogue
            .into_iter()
            .map(|m| Turn {
                role: Some(match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![text(&m.content)],
            })
            .collect();

        Self {
            system_instruction,
            contents,
        }
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PromptError> {
        let body = GenerateContentBody::from_messages(messages);
        debug!(turns = body.contents.len(), "--> Sending Gemini request");

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi(format!("{status}: {detail}")));
        }

        let reply: GenerateContentReply = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        let candidate = reply
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::AiApi("Gemini returned no candidates".to_string()))?;
        let answer: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        Ok(answer)
    }
}
