//! # Media Matching
//!
//! Finds the media assets to show for a visual trigger. Assets are matched by
//! type and tag first; when nothing is tagged, an optional semantic fallback
//! embeds `"{media_type} for {tag} course"` and ranks assets of that type by
//! similarity.

use crate::{
    errors::MediaError,
    prompts::core::media_query,
    providers::{ai::EmbeddingProvider, db::storage::MediaStore},
    types::MediaAsset,
};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MEDIA_MATCH_COUNT: u32 = 5;

#[derive(Debug, Clone)]
pub struct MediaMatcher {
    store: Arc<dyn MediaStore>,
    /// Enables the semantic fallback when set.
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    match_count: u32,
}

impl MediaMatcher {
    /// A matcher that only does tag lookups.
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self {
            store,
            embedder: None,
            match_count: DEFAULT_MEDIA_MATCH_COUNT,
        }
    }

    /// Enables the semantic fallback.
    pub fn with_semantic_fallback(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        match_count: u32,
    ) -> Self {
        self.embedder = Some(embedder);
        self.match_count = match_count;
        self
    }

    pub async fn find(&self, media_type: &str, tag: &str) -> Result<Vec<MediaAsset>, MediaError> {
        let media_type = media_type.trim().to_lowercase();
        if media_type.is_empty() {
            return Err(MediaError::EmptyMediaType);
        }
        let tag = tag.trim();

        let tagged = self
            .store
            .find_media(&media_type, tag)
            .await
            .map_err(MediaError::Store)?;
        debug!(media_type = %media_type, tag = %tag, count = tagged.len(), "Tag match finished");

        let Some(embedder) = self.embedder.as_ref().filter(|_| tagged.is_empty()) else {
            return Ok(tagged);
        };

        let query = media_query(&media_type, tag);
        info!(query = %query, "No tagged media; falling back to semantic match");
        let vector = embedder.embed(&query).await.map_err(MediaError::Embedding)?;
        self.store
            .match_media(&media_type, &vector, self.match_count)
            .await
            .map_err(MediaError::Store)
    }
}
