//! # Supabase (PostgREST) Provider
//!
//! Talks to a hosted Supabase project over its REST interface. Persona lookup and
//! chunk matching go through the project's RPC functions; everything else is plain
//! table access with PostgREST filter syntax.

use crate::{
    errors::PromptError,
    providers::db::storage::{
        ClassCatalog, MediaStore, PromptStore, SemanticRetriever, SessionLog, TrainingData,
    },
    types::{
        ClickEvent, MediaAsset, MoveEvent, RetrievedChunk, SessionExchange, SystemPrompt,
        TrainingRow, UpcomingClass,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{self, Debug};
use tracing::debug;

/// Names of the RPC functions and tables the provider talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseTables {
    #[serde(default = "default_persona_rpc")]
    pub persona_rpc: String,
    #[serde(default = "default_match_rpc")]
    pub match_rpc: String,
    #[serde(default = "default_media_match_rpc")]
    pub media_match_rpc: String,
    #[serde(default = "default_training_table")]
    pub training_table: String,
    #[serde(default = "default_embedding_column")]
    pub embedding_column: String,
    #[serde(default = "default_media_table")]
    pub media_table: String,
    #[serde(default = "default_classes_table")]
    pub classes_table: String,
    #[serde(default = "default_sessions_table")]
    pub sessions_table: String,
    #[serde(default = "default_messages_table")]
    pub messages_table: String,
    #[serde(default = "default_clicks_table")]
    pub clicks_table: String,
    #[serde(default = "default_moves_table")]
    pub moves_table: String,
}

fn default_persona_rpc() -> String {
    "get_persona_with_global".to_string()
}
fn default_match_rpc() -> String {
    "match_ai_admissions_trainingdata".to_string()
}
fn default_media_match_rpc() -> String {
    "match_ai_media_assets".to_string()
}
fn default_training_table() -> String {
    "ai_admissions_trainingdata".to_string()
}
fn default_embedding_column() -> String {
    "embedding_1536".to_string()
}
fn default_media_table() -> String {
    "ai_media_assets".to_string()
}
fn default_classes_table() -> String {
    "upcoming_classes".to_string()
}
fn default_sessions_table() -> String {
    "chat_sessions".to_string()
}
fn default_messages_table() -> String {
    "chat_messages".to_string()
}
fn default_clicks_table() -> String {
    "session_clicks".to_string()
}
fn default_moves_table() -> String {
    "session_moves".to_string()
}

impl Default for SupabaseTables {
    fn default() -> Self {
        Self {
            persona_rpc: default_persona_rpc(),
            match_rpc: default_match_rpc(),
            media_match_rpc: default_media_match_rpc(),
            training_table: default_training_table(),
            embedding_column: default_embedding_column(),
            media_table: default_media_table(),
            classes_table: default_classes_table(),
            sessions_table: default_sessions_table(),
            messages_table: default_messages_table(),
            clicks_table: default_clicks_table(),
            moves_table: default_moves_table(),
        }
    }
}

/// A storage provider backed by a Supabase project's REST API.
#[derive(Clone)]
pub struct SupabaseProvider {
    client: ReqwestClient,
    rest_url: String,
    service_key: String,
    tables: SupabaseTables,
}

impl Debug for SupabaseProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseProvider")
            .field("rest_url", &self.rest_url)
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct MatchedChunk {
    text: String,
    #[serde(default)]
    similarity: Option<f64>,
}

#[derive(Serialize)]
struct ClickRow<'a> {
    session_id: &'a str,
    label: &'a str,
    clicked_at: &'a str,
}

#[derive(Serialize)]
struct MoveRow<'a> {
    session_id: &'a str,
    x: f64,
    y: f64,
    t: i64,
}

impl SupabaseProvider {
    /// Creates a provider for the project at `project_url` (e.g. `https://xyz.supabase.co`).
    pub fn new(
        project_url: &str,
        service_key: String,
        tables: SupabaseTables,
    ) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            service_key,
            tables,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, PromptError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::StorageOperationFailed(format!(
                "{status}: {error_text}"
            )));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, PromptError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        args: Value,
    ) -> Result<T, PromptError> {
        debug!(function = %function, "--> Calling Supabase RPC");
        let url = format!("{}/rpc/{function}", self.rest_url);
        self.send_json(self.client.post(url).json(&args)).await
    }

    async fn insert_rows<T: Serialize + ?Sized>(
        &self,
        table: &str,
        rows: &T,
    ) -> Result<(), PromptError> {
        self.send(
            self.client
                .post(self.table_url(table))
                .header("Prefer", "return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PromptStore for SupabaseProvider {
    async fn get_system_prompt(
        &self,
        persona_id: &str,
        prompt_key: &str,
    ) -> Result<Option<SystemPrompt>, PromptError> {
        let rows: Vec<SystemPrompt> = self
            .rpc(
                &self.tables.persona_rpc,
                json!({ "persona_id_input": persona_id, "prompt_key": prompt_key }),
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl SemanticRetriever for SupabaseProvider {
    async fn match_chunks(
        &self,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        let rows: Vec<MatchedChunk> = self
            .rpc(
                &self.tables.match_rpc,
                json!({ "query_embedding": query_vector, "match_count": match_count }),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| RetrievedChunk {
                text: m.text,
                similarity: m.similarity,
            })
            .collect())
    }
}

/// PostgREST `cs` (array contains) filter for a single element.
///
/// The element is double-quoted, so `"` and `\` inside it must be escaped.
fn array_contains_filter(element: &str) -> String {
    let escaped = element.replace('\\', "\\\\").replace('"', "\\\"");
    format!("cs.{{\"{escaped}\"}}")
}

#[async_trait]
impl MediaStore for SupabaseProvider {
    async fn find_media(
        &self,
        media_type: &str,
        tag: &str,
    ) -> Result<Vec<MediaAsset>, PromptError> {
        let request = self.client.get(self.table_url(&self.tables.media_table)).query(&[
            ("select", "media_url,title,caption,syllabus_json".to_string()),
            ("media_type", format!("eq.{media_type}")),
            ("tags", array_contains_filter(tag)),
        ]);
        self.send_json(request).await
    }

    async fn match_media(
        &self,
        media_type: &str,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<MediaAsset>, PromptError> {
        self.rpc(
            &self.tables.media_match_rpc,
            json!({
                "query_embedding": query_vector,
                "match_count": match_count,
                "media_type_input": media_type,
            }),
        )
        .await
    }
}

#[async_trait]
impl ClassCatalog for SupabaseProvider {
    async fn upcoming_classes(&self, from: NaiveDate) -> Result<Vec<UpcomingClass>, PromptError> {
        let request = self.client.get(self.table_url(&self.tables.classes_table)).query(&[
            (
                "select",
                "course_name,course_location,course_length,start_date,registration_link"
                    .to_string(),
            ),
            ("start_date", format!("gte.{}", from.format("%Y-%m-%d"))),
            ("order", "start_date.asc".to_string()),
        ]);
        self.send_json(request).await
    }
}

#[async_trait]
impl SessionLog for SupabaseProvider {
    async fn upsert_session(
        &self,
        session_id: &str,
        persona_id: &str,
        metadata: Option<&Value>,
    ) -> Result<(), PromptError> {
        let mut row = json!({ "session_id": session_id, "persona_id": persona_id });
        // Leaving `metadata` out of the payload keeps the stored value on merge.
        if let Some(metadata) = metadata {
            row["metadata"] = metadata.clone();
        }
        self.send(
            self.client
                .post(self.table_url(&self.tables.sessions_table))
                .query(&[("on_conflict", "session_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&row),
        )
        .await?;
        Ok(())
    }

    async fn record_exchange(&self, exchange: &SessionExchange) -> Result<(), PromptError> {
        let row = json!({
            "session_id": exchange.session_id,
            "persona_id": exchange.persona_id,
            "query": exchange.query,
            "response": exchange.response,
            "visual_trigger": exchange.trigger.map(|t| t.as_str()),
        });
        self.insert_rows(&self.tables.messages_table, &row).await
    }

    async fn record_clicks(
        &self,
        session_id: &str,
        clicks: &[ClickEvent],
    ) -> Result<usize, PromptError> {
        if clicks.is_empty() {
            return Ok(0);
        }
        let rows: Vec<ClickRow<'_>> = clicks
            .iter()
            .map(|c| ClickRow {
                session_id,
                label: &c.label,
                clicked_at: &c.time,
            })
            .collect();
        self.insert_rows(&self.tables.clicks_table, &rows).await?;
        Ok(rows.len())
    }

    async fn record_moves(
        &self,
        session_id: &str,
        moves: &[MoveEvent],
    ) -> Result<usize, PromptError> {
        if moves.is_empty() {
            return Ok(0);
        }
        let rows: Vec<MoveRow<'_>> = moves
            .iter()
            .map(|m| MoveRow {
                session_id,
                x: m.x,
                y: m.y,
                t: m.t,
            })
            .collect();
        self.insert_rows(&self.tables.moves_table, &rows).await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl TrainingData for SupabaseProvider {
    async fn rows_missing_embedding(&self, limit: u32) -> Result<Vec<TrainingRow>, PromptError> {
        let request = self
            .client
            .get(self.table_url(&self.tables.training_table))
            .query(&[
                ("select", "id,text".to_string()),
                (self.tables.embedding_column.as_str(), "is.null".to_string()),
                ("limit", limit.to_string()),
            ]);
        self.send_json(request).await
    }

    async fn update_embedding(&self, id: i64, vector: &[f32]) -> Result<(), PromptError> {
        let mut body = serde_json::Map::new();
        body.insert(self.tables.embedding_column.clone(), json!(vector));
        self.send(
            self.client
                .patch(self.table_url(&self.tables.training_table))
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=minimal")
                .json(&Value::Object(body)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_contains_filter_escapes_quotes_and_backslashes() {
        assert_eq!(array_contains_filter("wfa"), r#"cs.{"wfa"}"#);
        assert_eq!(
            array_contains_filter(r#"5" splint"#),
            r#"cs.{"5\" splint"}"#
        );
        assert_eq!(array_contains_filter(r"a\b"), r#"cs.{"a\\b"}"#);
    }
}
