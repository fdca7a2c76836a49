//! # Storage Capabilities
//!
//! Each external data concern is a separate trait so that a backend can implement
//! only what it supports and callers depend only on what they use. Both the embedded
//! SQLite provider and the hosted Supabase provider implement all of them.

use crate::{
    errors::PromptError,
    types::{
        ClickEvent, MediaAsset, MoveEvent, RetrievedChunk, SessionExchange, SystemPrompt,
        TrainingRow, UpcomingClass,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt::Debug;

/// Resolves the two-part system prompt for a persona.
#[async_trait]
pub trait PromptStore: Send + Sync + Debug {
    /// Returns `Ok(None)` when the persona or the global prompt key is unknown.
    async fn get_system_prompt(
        &self,
        persona_id: &str,
        prompt_key: &str,
    ) -> Result<Option<SystemPrompt>, PromptError>;
}

/// Finds the stored chunks most similar to a query vector.
#[async_trait]
pub trait SemanticRetriever: Send + Sync + Debug {
    /// Returns at most `match_count` chunks, most similar first.
    async fn match_chunks(
        &self,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<RetrievedChunk>, PromptError>;
}

/// Looks up media assets for visual triggers.
#[async_trait]
pub trait MediaStore: Send + Sync + Debug {
    /// Returns assets of `media_type` whose tags contain `tag`, in store order.
    async fn find_media(&self, media_type: &str, tag: &str)
        -> Result<Vec<MediaAsset>, PromptError>;

    /// Returns assets of `media_type` ranked by similarity to `query_vector`.
    async fn match_media(
        &self,
        media_type: &str,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<MediaAsset>, PromptError>;
}

/// Lists scheduled classes.
#[async_trait]
pub trait ClassCatalog: Send + Sync + Debug {
    /// Returns classes starting on or after `from`, earliest first.
    async fn upcoming_classes(&self, from: NaiveDate) -> Result<Vec<UpcomingClass>, PromptError>;
}

/// Persists chat-session analytics.
#[async_trait]
pub trait SessionLog: Send + Sync + Debug {
    /// Creates the session if needed; `metadata`, when given, replaces the stored metadata.
    async fn upsert_session(
        &self,
        session_id: &str,
        persona_id: &str,
        metadata: Option<&Value>,
    ) -> Result<(), PromptError>;

    async fn record_exchange(&self, exchange: &SessionExchange) -> Result<(), PromptError>;

    /// Returns the number of stored clicks.
    async fn record_clicks(
        &self,
        session_id: &str,
        clicks: &[ClickEvent],
    ) -> Result<usize, PromptError>;

    /// Returns the number of stored movement samples.
    async fn record_moves(&self, session_id: &str, moves: &[MoveEvent])
        -> Result<usize, PromptError>;
}

/// Access to training rows for the embedding backfill.
#[async_trait]
pub trait TrainingData: Send + Sync + Debug {
    async fn rows_missing_embedding(&self, limit: u32) -> Result<Vec<TrainingRow>, PromptError>;

    async fn update_embedding(&self, id: i64, vector: &[f32]) -> Result<(), PromptError>;
}
