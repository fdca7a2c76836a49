//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port. The chat and embedding
//! providers point at an `httpmock::MockServer`, storage is a temporary SQLite
//! file, and the test keeps its own handle to that database for seeding and
//! inspecting rows.

// Not every test file uses every helper.
#![allow(unused)]

use admitrag::providers::db::sqlite::SqliteProvider;
use admitrag_server::{
    config, router,
    state::{build_app_state_with_storage, AppState, StorageHandles},
};
use anyhow::Result;
use axum::serve;
use httpmock::MockServer;
use reqwest::Client;
use serde_json::json;
use std::{fs::File, io::Write, net::SocketAddr, sync::Arc};
use tempfile::{tempdir, TempDir};
use tokio::net::TcpListener;

pub const GLOBAL_PROMPT_KEY: &str = "brand_v1";
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";
pub const CHAT_PATH: &str = "/v1/chat/completions";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub db: Arc<SqliteProvider>,
    pub app_state: AppState,
    _dir: TempDir,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with the default test configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_yaml("").await
    }

    /// Spawns the application server, appending `extra_yaml` to the test config.
    pub async fn spawn_with_yaml(extra_yaml: &str) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let dir = tempdir()?;
        let db_path = dir.path().join("admitrag.db");
        let db_path = db_path.to_string_lossy().to_string();

        let config_path = dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
global_prompt_key: "{GLOBAL_PROMPT_KEY}"
storage:
  provider: "sqlite"
  db_url: "{db_path}"
chat:
  provider: "openai"
  api_url: "{chat_url}"
  model_name: "mock-chat-model"
embedding:
  api_url: "{embedding_url}"
  model_name: "mock-embedding-model"
{extra_yaml}
"#,
            chat_url = mock_server.url(CHAT_PATH),
            embedding_url = mock_server.url(EMBEDDINGS_PATH),
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(&config_path.to_string_lossy()))?;

        let db = Arc::new(SqliteProvider::new(&db_path).await?);
        db.initialize_schema().await?;
        let app_state =
            build_app_state_with_storage(config, StorageHandles::from_provider(db.clone()))?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let app = router::create_router(app_state.clone());
        tokio::spawn(async move {
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            db,
            app_state,
            _dir: dir,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    /// Stores the brand prompt and the "default" persona.
    pub async fn seed_default_persona(&self) -> Result<()> {
        self.db
            .upsert_global_prompt(GLOBAL_PROMPT_KEY, "BRAND.")
            .await?;
        self.db
            .upsert_persona("default", "You are a WFA assistant.")
            .await?;
        Ok(())
    }

    /// Makes the embedding endpoint return `vector` for every input.
    pub async fn mock_embedding(&self, vector: &[f32]) -> httpmock::Mock<'_> {
        let body = json!({"data": [{"embedding": vector}]});
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path(EMBEDDINGS_PATH);
                then.status(200).json_body(body);
            })
            .await
    }

    /// Makes the chat endpoint reply with `content`.
    pub async fn mock_chat(&self, content: &str) -> httpmock::Mock<'_> {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": content}}]});
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path(CHAT_PATH);
                then.status(200).json_body(body);
            })
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
