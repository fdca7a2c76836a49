pub mod embedding;
pub mod gemini;
pub mod openai;

use crate::{errors::PromptError, types::ChatMessage};
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::HttpEmbeddingProvider;
use std::fmt::Debug;

/// A trait for interacting with a chat-completion provider.
///
/// Implementations receive the full ordered message list and return the single
/// generated reply.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);

/// A trait for turning text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, PromptError>;
}
