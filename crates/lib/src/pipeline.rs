//! # Query Pipeline
//!
//! Turns a user question into a grounded chat completion:
//!
//! 1. resolve the persona's system prompt,
//! 2. embed the question,
//! 3. retrieve the closest training chunks,
//! 4. ask the chat model with a `Context:`/`Question:` user message,
//! 5. decode the visual directive out of the reply.
//!
//! Each step is a hard sequence point. A failure stops the run and is reported as a
//! single [`PipelineError`]; nothing is retried.

use crate::{
    directive::DirectiveDecoder,
    errors::{PipelineError, PromptError},
    prompts::core::{context_user_prompt, CONTEXT_SEPARATOR, PROMPT_SEPARATOR},
    providers::{
        ai::{AiProvider, EmbeddingProvider},
        db::storage::{PromptStore, SemanticRetriever},
    },
    types::{ChatMessage, DecodedResponse, RetrievedChunk, SystemPrompt},
};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// The number of chunks retrieved when not configured otherwise.
pub const DEFAULT_MATCH_COUNT: u32 = 3;

/// Immutable settings shared by every run of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Selects the global prefix row used for every persona.
    pub global_prompt_key: String,
    pub match_count: u32,
    /// Appended to the system prompt when present.
    pub directive_instructions: Option<String>,
    /// Upper bound for each external call.
    pub call_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            global_prompt_key: String::new(),
            match_count: DEFAULT_MATCH_COUNT,
            directive_instructions: None,
            call_timeout: None,
        }
    }
}

/// The retrieval-augmented query pipeline.
///
/// Holds only shared handles and immutable options, so one instance serves
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    prompt_store: Arc<dyn PromptStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: Arc<dyn SemanticRetriever>,
    chat: Arc<dyn AiProvider>,
    decoder: DirectiveDecoder,
    options: PipelineOptions,
}

impl QueryPipeline {
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Runs the pipeline for one question on behalf of `persona_id`.
    pub async fn handle(
        &self,
        query: &str,
        persona_id: &str,
    ) -> Result<DecodedResponse, PipelineError> {
        info!(persona_id = %persona_id, "[pipeline] handling query");
        let timeout = self.options.call_timeout;

        let prompt = bounded(
            timeout,
            self.prompt_store
                .get_system_prompt(persona_id, &self.options.global_prompt_key),
        )
        .await
        .map_err(PipelineError::UpstreamUnavailable)?
        .ok_or_else(|| {
            warn!(persona_id = %persona_id, "[pipeline] persona not found");
            PipelineError::PersonaNotFound(persona_id.to_string())
        })?;

        let system_prompt =
            compose_system_prompt(&prompt, self.options.directive_instructions.as_deref());

        let query_vector = bounded(timeout, self.embedder.embed(query))
            .await
            .map_err(PipelineError::EmbeddingFailed)?;
        if query_vector.is_empty() {
            return Err(PipelineError::EmbeddingFailed(
                "provider returned an empty vector".to_string(),
            ));
        }
        debug!(dimensions = query_vector.len(), "[pipeline] query embedded");

        let chunks = bounded(
            timeout,
            self.retriever
                .match_chunks(&query_vector, self.options.match_count),
        )
        .await
        .map_err(PipelineError::UpstreamUnavailable)?;
        if chunks.is_empty() {
            info!("[pipeline] no chunks matched the query");
            return Err(PipelineError::NoContextFound);
        }
        debug!(count = chunks.len(), "[pipeline] chunks retrieved");

        let messages = compose_request(&system_prompt, &join_context(&chunks), query);
        let raw_reply = bounded(timeout, self.chat.complete(&messages))
            .await
            .map_err(PipelineError::CompletionFailed)?;
        debug!(reply = %raw_reply, "<-- Raw completion");

        Ok(self.decoder.decode(&raw_reply))
    }
}

/// Awaits `call`, bounded by `limit` when set, flattening both failure kinds
/// into a message.
async fn bounded<T, F>(limit: Option<Duration>, call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, PromptError>>,
{
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| format!("timed out after {}ms", limit.as_millis()))?,
        None => call.await,
    };
    result.map_err(|e| e.to_string())
}

/// Builds the final system prompt: global prefix, persona prompt, then the
/// optional directive instructions.
pub fn compose_system_prompt(
    prompt: &SystemPrompt,
    directive_instructions: Option<&str>,
) -> String {
    let mut system = prompt.compose();
    if let Some(instructions) = directive_instructions.filter(|i| !i.is_empty()) {
        system.push_str(PROMPT_SEPARATOR);
        system.push_str(instructions);
    }
    system
}

/// Joins chunk texts in rank order.
pub fn join_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// The two-message request: one system message, then one user message.
pub fn compose_request(system_prompt: &str, context: &str, query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(context_user_prompt(context, query)),
    ]
}

/// A builder for [`QueryPipeline`].
#[derive(Default)]
pub struct QueryPipelineBuilder {
    prompt_store: Option<Arc<dyn PromptStore>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    retriever: Option<Arc<dyn SemanticRetriever>>,
    chat: Option<Arc<dyn AiProvider>>,
    options: PipelineOptions,
}

impl QueryPipelineBuilder {
    pub fn prompt_store(mut self, prompt_store: Arc<dyn PromptStore>) -> Self {
        self.prompt_store = Some(prompt_store);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn SemanticRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn chat(mut self, chat: Arc<dyn AiProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn global_prompt_key(mut self, key: impl Into<String>) -> Self {
        self.options.global_prompt_key = key.into();
        self
    }

    pub fn match_count(mut self, match_count: u32) -> Self {
        self.options.match_count = match_count;
        self
    }

    pub fn directive_instructions(mut self, instructions: Option<String>) -> Self {
        self.options.directive_instructions = instructions;
        self
    }

    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.call_timeout = timeout;
        self
    }

    /// Builds the pipeline.
    ///
    /// Fails with [`PromptError::MissingCollaborator`] if any of the four
    /// collaborators was not provided.
    pub fn build(self) -> Result<QueryPipeline, PromptError> {
        Ok(QueryPipeline {
            prompt_store: self
                .prompt_store
                .ok_or(PromptError::MissingCollaborator("prompt_store"))?,
            embedder: self
                .embedder
                .ok_or(PromptError::MissingCollaborator("embedder"))?,
            retriever: self
                .retriever
                .ok_or(PromptError::MissingCollaborator("retriever"))?,
            chat: self.chat.ok_or(PromptError::MissingCollaborator("chat"))?,
            decoder: DirectiveDecoder::new()?,
            options: self.options,
        })
    }
}
