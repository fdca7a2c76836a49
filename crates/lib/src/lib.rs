//! # Admissions RAG
//!
//! This crate answers admissions questions with retrieval-augmented generation.
//! A [`QueryPipeline`] resolves a persona's system prompt, embeds the question,
//! retrieves the closest training chunks and asks a chat model for a grounded
//! answer. The [`DirectiveDecoder`] then extracts the visual trigger the model
//! embedded in its reply.
//!
//! Every external system sits behind a trait in [`providers`], with OpenAI,
//! Gemini, SQLite (Turso) and Supabase implementations.

pub mod backfill;
pub mod directive;
pub mod errors;
pub mod media;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod types;

pub use backfill::{backfill_embeddings, BackfillOptions, BackfillReport};
pub use directive::DirectiveDecoder;
pub use errors::{BackfillError, MediaError, PipelineError, PromptError};
pub use media::MediaMatcher;
pub use pipeline::{PipelineOptions, QueryPipeline, QueryPipelineBuilder};
pub use types::{DecodedResponse, Trigger};
