//! # Application Configuration
//!
//! This module defines the configuration structure for `admitrag-server` and the
//! logic for loading it from an optional `config.yml` file and environment
//! variables. The same loader is used by the `server` and `backfill` binaries.

use admitrag::{providers::db::supabase::SupabaseTables, types::ProviderConfig};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
    /// Indicates a required setting is absent or empty.
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Missing(key) => {
                write!(f, "Missing required configuration value '{key}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The key of the shared brand prompt. Loaded from `GLOBAL_PROMPT_KEY` env var.
    #[serde(default)]
    pub global_prompt_key: String,
    #[serde(default)]
    pub storage: StorageConfig,
    /// The chat-completion provider.
    pub chat: ProviderConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_port() -> u16 {
    8001
}

/// Where personas, training data, media and analytics live.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Either "sqlite" or "supabase".
    #[serde(default = "default_storage_provider")]
    pub provider: String,
    /// The path to the SQLite database file.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_service_key: Option<String>,
    /// Overrides for the Supabase RPC and table names.
    #[serde(default)]
    pub tables: SupabaseTables,
}

fn default_storage_provider() -> String {
    "sqlite".to_string()
}

fn default_db_url() -> String {
    "db/admitrag.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_storage_provider(),
            db_url: default_db_url(),
            supabase_url: None,
            supabase_service_key: None,
            tables: SupabaseTables::default(),
        }
    }
}

/// Configuration for the embedding model provider.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub api_url: String,
    #[serde(default = "default_embedding_model")]
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_url(),
            model_name: default_embedding_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// How many chunks are retrieved per query.
    #[serde(default = "default_match_count")]
    pub match_count: u32,
    /// Text appended to every system prompt.
    #[serde(default)]
    pub directive_instructions: Option<String>,
    /// Appends the built-in marker instructions when no custom text is set.
    #[serde(default)]
    pub use_default_directives: bool,
    /// Upper bound for each external call. Unbounded when unset.
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
}

fn default_match_count() -> u32 {
    admitrag::pipeline::DEFAULT_MATCH_COUNT
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_count: default_match_count(),
            directive_instructions: None,
            use_default_directives: false,
            call_timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Falls back to a vector search when no asset carries the tag.
    #[serde(default = "default_semantic_fallback")]
    pub semantic_fallback: bool,
    #[serde(default = "default_media_match_count")]
    pub match_count: u32,
}

fn default_semantic_fallback() -> bool {
    true
}

fn default_media_match_count() -> u32 {
    admitrag::media::DEFAULT_MEDIA_MATCH_COUNT
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            semantic_fallback: default_semantic_fallback(),
            match_count: default_media_match_count(),
        }
    }
}

/// Origins allowed to call the API from a browser. Any origin when empty.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Returns the value of `var` when it is set and not empty.
fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the application configuration from a file and environment variables.
///
/// - Top-level keys like `port` and `global_prompt_key` are overridden by `PORT`
///   and `GLOBAL_PROMPT_KEY`.
/// - Nested keys are overridden by `ADMITRAG_...` variables (e.g.
///   `ADMITRAG_STORAGE__PROVIDER=supabase`).
/// - `SUPABASE_URL`, `SUPABASE_SERVICE_KEY` and `OPENAI_API_KEY` fill the
///   matching credentials when nothing else set them.
///
/// The file is read from `config_path_override`, then `CONFIG_PATH`, then
/// `config.yml`. Only an explicit path must exist.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults for the chat provider.
        .set_default("chat.provider", "openai")?
        .set_default("chat.model_name", "gpt-3.5-turbo")?;

    // Layer 2: Optional YAML file.
    let (config_path, required) = match config_path_override {
        Some(path) => (path.to_string(), true),
        None => match env::var("CONFIG_PATH") {
            Ok(path) => (path, true),
            Err(_) => ("config.yml".to_string(), false),
        },
    };
    match read_and_substitute(&config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if required => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => info!("No '{config_path}' found, using defaults and environment."),
    }

    let settings = builder
        // Layer 3: Load environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Layer 4: Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("ADMITRAG")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    // Layer 5: Well-known credentials.
    if config.storage.supabase_url.is_none() {
        config.storage.supabase_url = non_empty_env("SUPABASE_URL");
    }
    if config.storage.supabase_service_key.is_none() {
        config.storage.supabase_service_key = non_empty_env("SUPABASE_SERVICE_KEY");
    }
    if let Some(key) = non_empty_env("OPENAI_API_KEY") {
        if config.chat.api_key.is_none() {
            config.chat.api_key = Some(key.clone());
        }
        if config.embedding.api_key.is_none() {
            config.embedding.api_key = Some(key);
        }
    }

    config.global_prompt_key = config.global_prompt_key.trim().to_string();
    if config.global_prompt_key.is_empty() {
        return Err(ConfigError::Missing("GLOBAL_PROMPT_KEY"));
    }

    Ok(config)
}
