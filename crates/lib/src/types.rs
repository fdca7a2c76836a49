use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The role tag of a chat message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message sent to a chat-completion provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The two-part system prompt resolved for a persona.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    /// Brand-wide prefix shared by every persona.
    pub global_prefix: String,
    /// Persona-specific behavior prompt.
    #[serde(rename = "system_prompt")]
    pub persona_prompt: String,
}

impl SystemPrompt {
    /// Joins the two parts as `global_prefix + "\n\n" + persona_prompt`.
    pub fn compose(&self) -> String {
        format!("{}\n\n{}", self.global_prefix, self.persona_prompt)
    }
}

/// A chunk of reference text returned by a semantic search.
///
/// Its rank is its position in the returned sequence; `similarity` is informational.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            similarity: None,
        }
    }
}

/// A visual element the client is asked to render.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Slideshow,
    Syllabus,
    Video,
    Offer,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Slideshow => "slideshow",
            Trigger::Syllabus => "syllabus",
            Trigger::Video => "video",
            Trigger::Offer => "offer",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model reply with its directive markers decoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedResponse {
    /// The reply with every recognized marker removed and the ends trimmed.
    pub cleaned: String,
    pub trigger: Option<Trigger>,
    /// Arguments of a parameterized marker such as `[SHOW_OFFER:a,b]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_args: Vec<String>,
}

/// A media record matched for a visual trigger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub media_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus_json: Option<Value>,
}

/// A scheduled class offering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpcomingClass {
    pub course_name: String,
    #[serde(default)]
    pub course_location: Option<String>,
    #[serde(default)]
    pub course_length: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub registration_link: Option<String>,
}

/// A single click captured by the chat widget.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub label: String,
    pub time: String,
}

/// A single pointer-movement sample captured by the chat widget.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveEvent {
    pub x: f64,
    pub y: f64,
    pub t: i64,
}

/// One question/answer round recorded against a chat session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionExchange {
    pub session_id: String,
    pub persona_id: String,
    pub query: String,
    pub response: String,
    pub trigger: Option<Trigger>,
}

/// A training-data row that still lacks an embedding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrainingRow {
    pub id: i64,
    pub text: String,
}

/// A reusable configuration for a chat or embedding provider instance.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("openai" or "gemini").
    pub provider: String,
    /// The API URL. Optional for Gemini, where it can be derived from the model.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model_name: String,
}
