use admitrag::errors::PromptError;
use admitrag::providers::ai::{AiProvider, EmbeddingProvider};
use admitrag::providers::db::sqlite::SqliteProvider;
use admitrag::providers::db::storage::{PromptStore, SemanticRetriever};
use admitrag::types::{ChatMessage, RetrievedChunk, SystemPrompt};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
///
/// The database lives in a temporary directory that is removed on drop.
pub struct TestSetup {
    pub provider: SqliteProvider,
    pub db_path: String,
    _dir: TempDir,
}

impl TestSetup {
    /// Creates a new, isolated database file and initializes the schema.
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let provider = SqliteProvider::new(&db_path).await?;
        provider.initialize_schema().await?;
        Ok(Self {
            provider,
            db_path,
            _dir: dir,
        })
    }
}

/// Sleeps for the configured delay, if any. Lets tests drive call timeouts.
async fn pause(delay: &Mutex<Option<Duration>>) {
    let delay = *delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// --- Mock AI Provider ---

#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    default_response: Arc<Mutex<Option<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that answers every request with `response`.
    pub fn replying(response: &str) -> Self {
        let mock = Self::new();
        *mock.default_response.lock().unwrap() = Some(response.to_string());
        mock
    }

    /// Makes every call fail with an API error carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Delays every answer by `delay`.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Retrieves the recorded requests for assertion.
    pub fn get_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PromptError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        pause(&self.delay).await;
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(PromptError::AiApi(message));
        }

        self.default_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                PromptError::AiApi("MockAiProvider: no response programmed".to_string())
            })
    }
}

// --- Mock Embedding Provider ---

/// Returns a fixed vector for every input and records what it was asked to embed.
#[derive(Clone, Debug)]
pub struct MockEmbedder {
    vector: Vec<f32>,
    failure: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl MockEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            failure: Arc::default(),
            delay: Arc::default(),
            inputs: Arc::default(),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, PromptError> {
        self.inputs.lock().unwrap().push(input.to_string());
        pause(&self.delay).await;
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(PromptError::AiApi(message));
        }
        Ok(self.vector.clone())
    }
}

// --- Mock Prompt Store ---

#[derive(Clone, Debug, Default)]
pub struct MockPromptStore {
    prompts: Arc<Mutex<HashMap<(String, String), SystemPrompt>>>,
    failure: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
}

impl MockPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prompt(&self, persona_id: &str, prompt_key: &str, prompt: SystemPrompt) {
        self.prompts
            .lock()
            .unwrap()
            .insert((persona_id.to_string(), prompt_key.to_string()), prompt);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptStore for MockPromptStore {
    async fn get_system_prompt(
        &self,
        persona_id: &str,
        prompt_key: &str,
    ) -> Result<Option<SystemPrompt>, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(&self.delay).await;
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(PromptError::StorageConnection(message));
        }
        Ok(self
            .prompts
            .lock()
            .unwrap()
            .get(&(persona_id.to_string(), prompt_key.to_string()))
            .cloned())
    }
}

// --- Mock Semantic Retriever ---

#[derive(Clone, Debug, Default)]
pub struct MockRetriever {
    chunks: Vec<RetrievedChunk>,
    failure: Arc<Mutex<Option<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    requests: Arc<Mutex<Vec<(Vec<f32>, u32)>>>,
}

impl MockRetriever {
    /// A retriever returning `texts` in order, truncated to the requested count.
    pub fn new(texts: &[&str]) -> Self {
        Self {
            chunks: texts.iter().map(|t| RetrievedChunk::new(*t)).collect(),
            ..Default::default()
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// The `(query_vector, match_count)` pairs received so far.
    pub fn requests(&self) -> Vec<(Vec<f32>, u32)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SemanticRetriever for MockRetriever {
    async fn match_chunks(
        &self,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        self.requests
            .lock()
            .unwrap()
            .push((query_vector.to_vec(), match_count));
        pause(&self.delay).await;
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(PromptError::StorageOperationFailed(message));
        }
        Ok(self
            .chunks
            .iter()
            .take(match_count as usize)
            .cloned()
            .collect())
    }
}
