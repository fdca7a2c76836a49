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
use serde_json::Value;
use std::fmt::{self, Debug};
use tracing::{debug, info};
use turso::{Connection, Database, Row, Value as TursoValue};

pub mod sql;

/// A provider for a local SQLite database using Turso.
///
/// This provider holds a `Database` instance. When cloned, it shares the same
/// underlying database, so an in-memory database can be shared between handles.
#[derive(Clone)]
pub struct SqliteProvider {
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path, or `":memory:"` for an
    /// isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        // PRAGMA returns a row, so it goes through `query`.
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    fn connect(&self) -> Result<Connection, PromptError> {
        self.db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))
    }

    /// Ensures that all application tables exist. Idempotent.
    pub async fn initialize_schema(&self) -> Result<(), PromptError> {
        let conn = self.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    pub async fn upsert_global_prompt(
        &self,
        prompt_key: &str,
        global_prefix: &str,
    ) -> Result<(), PromptError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO global_prompts (prompt_key, global_prefix) VALUES (?, ?)
             ON CONFLICT(prompt_key) DO UPDATE SET global_prefix = excluded.global_prefix",
            vec![text_value(prompt_key), text_value(global_prefix)],
        )
        .await?;
        Ok(())
    }

    pub async fn upsert_persona(
        &self,
        persona_id: &str,
        system_prompt: &str,
    ) -> Result<(), PromptError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO personas (persona_id, system_prompt) VALUES (?, ?)
             ON CONFLICT(persona_id) DO UPDATE SET system_prompt = excluded.system_prompt",
            vec![text_value(persona_id), text_value(system_prompt)],
        )
        .await?;
        Ok(())
    }

    /// Inserts a training chunk, with or without its embedding.
    pub async fn insert_training_text(
        &self,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<i64, PromptError> {
        let conn = self.connect()?;
        let embedding_value = embedding
            .map(|v| TursoValue::Blob(vector_to_blob(v)))
            .unwrap_or(TursoValue::Null);
        insert_returning_id(
            &conn,
            "INSERT INTO training_data (text, embedding) VALUES (?, ?) RETURNING id",
            vec![text_value(text), embedding_value],
        )
        .await
    }

    /// Inserts a media asset with its tags.
    pub async fn insert_media_asset(
        &self,
        media_type: &str,
        asset: &MediaAsset,
        tags: &[&str],
        embedding: Option<&[f32]>,
    ) -> Result<i64, PromptError> {
        let conn = self.connect()?;
        let syllabus = match &asset.syllabus_json {
            Some(v) => TursoValue::Text(serde_json::to_string(v)?),
            None => TursoValue::Null,
        };
        let embedding_value = embedding
            .map(|v| TursoValue::Blob(vector_to_blob(v)))
            .unwrap_or(TursoValue::Null);
        let asset_id = insert_returning_id(
            &conn,
            "INSERT INTO media_assets (media_type, media_url, title, caption, syllabus_json, embedding)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
            vec![
                text_value(&media_type.to_lowercase()),
                text_value(&asset.media_url),
                opt_text_value(asset.title.as_deref()),
                opt_text_value(asset.caption.as_deref()),
                syllabus,
                embedding_value,
            ],
        )
        .await?;

        for tag in tags {
            conn.execute(
                "INSERT INTO media_asset_tags (asset_id, tag) VALUES (?, ?)",
                vec![TursoValue::Integer(asset_id), text_value(tag)],
            )
            .await?;
        }
        Ok(asset_id)
    }

    pub async fn insert_class(&self, class: &UpcomingClass) -> Result<(), PromptError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO upcoming_classes (course_name, course_location, course_length, start_date, registration_link)
             VALUES (?, ?, ?, ?, ?)",
            vec![
                text_value(&class.course_name),
                opt_text_value(class.course_location.as_deref()),
                opt_text_value(class.course_length.as_deref()),
                text_value(&class.start_date.format("%Y-%m-%d").to_string()),
                opt_text_value(class.registration_link.as_deref()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Counts the rows of a table. Used by diagnostics and tests.
    pub async fn count_rows(&self, table: &str) -> Result<i64, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), ())
            .await?;
        match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(n) => Ok(n),
                _ => Ok(0),
            },
            None => Ok(0),
        }
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

/// Encodes a vector as little-endian `f32` bytes, the layout `vector32` reads.
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

async fn insert_returning_id(
    conn: &Connection,
    sql: &str,
    params: Vec<TursoValue>,
) -> Result<i64, PromptError> {
    let mut rows = conn.query(sql, params).await?;
    match rows.next().await? {
        Some(row) => match row.get_value(0)? {
            TursoValue::Integer(id) => Ok(id),
            other => Err(PromptError::StorageOperationFailed(format!(
                "Unexpected id value: {other:?}"
            ))),
        },
        None => Err(PromptError::StorageOperationFailed(
            "Insert returned no id".to_string(),
        )),
    }
}

fn text_value(s: &str) -> TursoValue {
    TursoValue::Text(s.to_string())
}

fn opt_text_value(s: Option<&str>) -> TursoValue {
    s.map(text_value).unwrap_or(TursoValue::Null)
}

fn get_text(row: &Row, idx: usize) -> Result<String, PromptError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn get_opt_text(row: &Row, idx: usize) -> Result<Option<String>, PromptError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn get_real(row: &Row, idx: usize) -> Result<Option<f64>, PromptError> {
    match row.get_value(idx)? {
        TursoValue::Real(f) => Ok(Some(f)),
        TursoValue::Integer(i) => Ok(Some(i as f64)),
        _ => Ok(None),
    }
}

fn media_from_row(row: &Row) -> Result<MediaAsset, PromptError> {
    // syllabus_json is stored as text but served as parsed JSON.
    let syllabus_json = match get_opt_text(row, 3)? {
        Some(raw) => Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
        None => None,
    };
    Ok(MediaAsset {
        media_url: get_text(row, 0)?,
        title: get_opt_text(row, 1)?,
        caption: get_opt_text(row, 2)?,
        syllabus_json,
    })
}

#[async_trait]
impl PromptStore for SqliteProvider {
    async fn get_system_prompt(
        &self,
        persona_id: &str,
        prompt_key: &str,
    ) -> Result<Option<SystemPrompt>, PromptError> {
        debug!(persona_id = %persona_id, prompt_key = %prompt_key, "Looking up system prompt");
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                sql::SELECT_SYSTEM_PROMPT,
                vec![text_value(persona_id), text_value(prompt_key)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(SystemPrompt {
                global_prefix: get_text(&row, 0)?,
                persona_prompt: get_text(&row, 1)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SemanticRetriever for SqliteProvider {
    async fn match_chunks(
        &self,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        info!(match_count, "Executing SQLite vector search on training data.");
        let conn = self.connect()?;
        let sql = sql::match_training_chunks(query_vector, match_count);
        let mut rows = conn.query(&sql, ()).await?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(RetrievedChunk {
                text: get_text(&row, 0)?,
                similarity: get_real(&row, 1)?,
            });
        }
        Ok(chunks)
    }
}

#[async_trait]
impl MediaStore for SqliteProvider {
    async fn find_media(
        &self,
        media_type: &str,
        tag: &str,
    ) -> Result<Vec<MediaAsset>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                sql::SELECT_FIND_MEDIA,
                vec![text_value(media_type), text_value(tag)],
            )
            .await?;

        let mut assets = Vec::new();
        while let Some(row) = rows.next().await? {
            assets.push(media_from_row(&row)?);
        }
        Ok(assets)
    }

    async fn match_media(
        &self,
        media_type: &str,
        query_vector: &[f32],
        match_count: u32,
    ) -> Result<Vec<MediaAsset>, PromptError> {
        let conn = self.connect()?;
        let sql = sql::match_media_assets(query_vector, match_count);
        let mut rows = conn.query(&sql, vec![text_value(media_type)]).await?;

        let mut assets = Vec::new();
        while let Some(row) = rows.next().await? {
            assets.push(media_from_row(&row)?);
        }
        Ok(assets)
    }
}

#[async_trait]
impl ClassCatalog for SqliteProvider {
    async fn upcoming_classes(&self, from: NaiveDate) -> Result<Vec<UpcomingClass>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                sql::SELECT_UPCOMING_CLASSES,
                vec![text_value(&from.format("%Y-%m-%d").to_string())],
            )
            .await?;

        let mut classes = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw_date = get_text(&row, 3)?;
            // Dates may carry a time component; only the date part is significant.
            let day = raw_date.get(..10).unwrap_or(&raw_date);
            let start_date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                PromptError::StorageOperationFailed(format!("Invalid start_date '{raw_date}': {e}"))
            })?;
            classes.push(UpcomingClass {
                course_name: get_text(&row, 0)?,
                course_location: get_opt_text(&row, 1)?,
                course_length: get_opt_text(&row, 2)?,
                start_date,
                registration_link: get_opt_text(&row, 4)?,
            });
        }
        Ok(classes)
    }
}

#[async_trait]
impl SessionLog for SqliteProvider {
    async fn upsert_session(
        &self,
        session_id: &str,
        persona_id: &str,
        metadata: Option<&Value>,
    ) -> Result<(), PromptError> {
        let conn = self.connect()?;
        let metadata_value = match metadata {
            Some(v) => TursoValue::Text(serde_json::to_string(v)?),
            None => TursoValue::Null,
        };
        conn.execute(
            sql::UPSERT_SESSION,
            vec![text_value(session_id), text_value(persona_id), metadata_value],
        )
        .await?;
        Ok(())
    }

    async fn record_exchange(&self, exchange: &SessionExchange) -> Result<(), PromptError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, persona_id, query, response, visual_trigger)
             VALUES (?, ?, ?, ?, ?)",
            vec![
                text_value(&exchange.session_id),
                text_value(&exchange.persona_id),
                text_value(&exchange.query),
                text_value(&exchange.response),
                opt_text_value(exchange.trigger.map(|t| t.as_str())),
            ],
        )
        .await?;
        Ok(())
    }

    async fn record_clicks(
        &self,
        session_id: &str,
        clicks: &[ClickEvent],
    ) -> Result<usize, PromptError> {
        let conn = self.connect()?;
        for click in clicks {
            conn.execute(
                "INSERT INTO session_clicks (session_id, label, clicked_at) VALUES (?, ?, ?)",
                vec![
                    text_value(session_id),
                    text_value(&click.label),
                    text_value(&click.time),
                ],
            )
            .await?;
        }
        Ok(clicks.len())
    }

    async fn record_moves(
        &self,
        session_id: &str,
        moves: &[MoveEvent],
    ) -> Result<usize, PromptError> {
        let conn = self.connect()?;
        for sample in moves {
            conn.execute(
                "INSERT INTO session_moves (session_id, x, y, t) VALUES (?, ?, ?, ?)",
                vec![
                    text_value(session_id),
                    TursoValue::Real(sample.x),
                    TursoValue::Real(sample.y),
                    TursoValue::Integer(sample.t),
                ],
            )
            .await?;
        }
        Ok(moves.len())
    }
}

#[async_trait]
impl TrainingData for SqliteProvider {
    async fn rows_missing_embedding(&self, limit: u32) -> Result<Vec<TrainingRow>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT id, text FROM training_data WHERE embedding IS NULL ORDER BY id ASC LIMIT {limit}"
                ),
                (),
            )
            .await?;

        let mut training_rows = Vec::new();
        while let Some(row) = rows.next().await? {
            let id = match row.get_value(0)? {
                TursoValue::Integer(i) => i,
                _ => continue,
            };
            training_rows.push(TrainingRow {
                id,
                text: get_text(&row, 1)?,
            });
        }
        Ok(training_rows)
    }

    async fn update_embedding(&self, id: i64, vector: &[f32]) -> Result<(), PromptError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE training_data SET embedding = ? WHERE id = ?",
            vec![TursoValue::Blob(vector_to_blob(vector)), TursoValue::Integer(id)],
        )
        .await?;
        Ok(())
    }
}
