//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The `AppState` holds the configuration and the
//! collaborator handles every request handler needs. All of them are `Arc`s, so
//! cloning the state per request is cheap.

use crate::config::{AppConfig, EmbeddingConfig, StorageConfig};
use admitrag::{
    prompts::core::DEFAULT_DIRECTIVE_INSTRUCTIONS,
    providers::{
        ai::{AiProvider, EmbeddingProvider, HttpEmbeddingProvider},
        db::{
            sqlite::SqliteProvider,
            storage::{
                ClassCatalog, MediaStore, PromptStore, SemanticRetriever, SessionLog, TrainingData,
            },
            supabase::SupabaseProvider,
        },
        factory::create_ai_provider,
    },
    MediaMatcher, QueryPipeline,
};
use anyhow::anyhow;
use std::{sync::Arc, time::Duration};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<QueryPipeline>,
    pub media: Arc<MediaMatcher>,
    pub classes: Arc<dyn ClassCatalog>,
    pub sessions: Arc<dyn SessionLog>,
}

/// Every storage capability, backed by the configured provider.
#[derive(Clone)]
pub struct StorageHandles {
    pub prompts: Arc<dyn PromptStore>,
    pub retriever: Arc<dyn SemanticRetriever>,
    pub media: Arc<dyn MediaStore>,
    pub classes: Arc<dyn ClassCatalog>,
    pub sessions: Arc<dyn SessionLog>,
    pub training: Arc<dyn TrainingData>,
}

impl StorageHandles {
    /// Uses one provider for every capability.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: PromptStore
            + SemanticRetriever
            + MediaStore
            + ClassCatalog
            + SessionLog
            + TrainingData
            + 'static,
    {
        Self {
            prompts: provider.clone(),
            retriever: provider.clone(),
            media: provider.clone(),
            classes: provider.clone(),
            sessions: provider.clone(),
            training: provider,
        }
    }
}

/// Connects to the configured storage backend.
///
/// SQLite databases get their schema created on first use.
pub async fn build_storage(config: &StorageConfig) -> anyhow::Result<StorageHandles> {
    match config.provider.as_str() {
        "sqlite" => {
            let provider = SqliteProvider::new(&config.db_url).await?;
            provider.initialize_schema().await?;
            info!(db_path = %config.db_url, "Initialized storage provider (SQLite).");
            Ok(StorageHandles::from_provider(Arc::new(provider)))
        }
        "supabase" => {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or_else(|| anyhow!("SUPABASE_URL is required for the supabase provider"))?;
            let key = config.supabase_service_key.clone().ok_or_else(|| {
                anyhow!("SUPABASE_SERVICE_KEY is required for the supabase provider")
            })?;
            let provider = SupabaseProvider::new(url, key, config.tables.clone())?;
            info!(url = %url, "Initialized storage provider (Supabase).");
            Ok(StorageHandles::from_provider(Arc::new(provider)))
        }
        other => Err(anyhow!("Unsupported storage provider '{other}'")),
    }
}

/// Builds the embedding client from the configuration.
pub fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedder = HttpEmbeddingProvider::new(
        config.api_url.clone(),
        config.model_name.clone(),
        config.api_key.clone(),
    )?;
    Ok(Arc::new(embedder))
}

/// Builds the shared application state from the configuration.
///
/// This function initializes all necessary services:
/// - the storage provider selected by `storage.provider`,
/// - the chat and embedding clients,
/// - the query pipeline and the media matcher wired to them.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let storage = build_storage(&config.storage).await?;
    build_app_state_with_storage(config, storage)
}

/// Builds the application state around already connected storage.
pub fn build_app_state_with_storage(
    config: AppConfig,
    storage: StorageHandles,
) -> anyhow::Result<AppState> {
    let embedder = build_embedder(&config.embedding)?;
    let chat: Arc<dyn AiProvider> = Arc::from(create_ai_provider(&config.chat)?);
    info!(
        provider = %config.chat.provider,
        model = %config.chat.model_name,
        "Initialized chat provider."
    );

    let directive_instructions = config.pipeline.directive_instructions.clone().or_else(|| {
        config
            .pipeline
            .use_default_directives
            .then(|| DEFAULT_DIRECTIVE_INSTRUCTIONS.to_string())
    });

    let pipeline = QueryPipeline::builder()
        .prompt_store(storage.prompts.clone())
        .embedder(embedder.clone())
        .retriever(storage.retriever.clone())
        .chat(chat)
        .global_prompt_key(config.global_prompt_key.clone())
        .match_count(config.pipeline.match_count)
        .directive_instructions(directive_instructions)
        .call_timeout(config.pipeline.call_timeout_secs.map(Duration::from_secs))
        .build()?;

    let mut media = MediaMatcher::new(storage.media.clone());
    if config.media.semantic_fallback {
        media = media.with_semantic_fallback(embedder, config.media.match_count);
    }

    Ok(AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
        media: Arc::new(media),
        classes: storage.classes,
        sessions: storage.sessions,
    })
}
