//! # SQLite Specific SQL Queries
//!
//! This module centralizes SQL strings for the SQLite provider so the provider
//! logic stays free of schema details.

pub const CREATE_GLOBAL_PROMPTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS global_prompts (
    prompt_key TEXT PRIMARY KEY,
    global_prefix TEXT NOT NULL
);";

pub const CREATE_PERSONAS_TABLE: &str = "CREATE TABLE IF NOT EXISTS personas (
    persona_id TEXT PRIMARY KEY,
    system_prompt TEXT NOT NULL
);";

pub const CREATE_TRAINING_DATA_TABLE: &str = "CREATE TABLE IF NOT EXISTS training_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    embedding BLOB,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);";

pub const CREATE_MEDIA_ASSETS_TABLE: &str = "CREATE TABLE IF NOT EXISTS media_assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_type TEXT NOT NULL,
    media_url TEXT NOT NULL,
    title TEXT,
    caption TEXT,
    syllabus_json TEXT,
    embedding BLOB
);";

pub const CREATE_MEDIA_ASSET_TAGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS media_asset_tags (
    asset_id INTEGER NOT NULL,
    tag TEXT NOT NULL
);";

pub const CREATE_UPCOMING_CLASSES_TABLE: &str = "CREATE TABLE IF NOT EXISTS upcoming_classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_name TEXT NOT NULL,
    course_location TEXT,
    course_length TEXT,
    start_date TEXT NOT NULL,
    registration_link TEXT
);";

pub const CREATE_CHAT_SESSIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS chat_sessions (
    session_id TEXT PRIMARY KEY,
    persona_id TEXT NOT NULL,
    metadata TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);";

pub const CREATE_CHAT_MESSAGES_TABLE: &str = "CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    persona_id TEXT NOT NULL,
    query TEXT NOT NULL,
    response TEXT NOT NULL,
    visual_trigger TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);";

pub const CREATE_SESSION_CLICKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS session_clicks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    label TEXT NOT NULL,
    clicked_at TEXT NOT NULL
);";

pub const CREATE_SESSION_MOVES_TABLE: &str = "CREATE TABLE IF NOT EXISTS session_moves (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    t INTEGER NOT NULL
);";

/// Every table the application needs, in creation order.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_GLOBAL_PROMPTS_TABLE,
    CREATE_PERSONAS_TABLE,
    CREATE_TRAINING_DATA_TABLE,
    CREATE_MEDIA_ASSETS_TABLE,
    CREATE_MEDIA_ASSET_TAGS_TABLE,
    CREATE_UPCOMING_CLASSES_TABLE,
    CREATE_CHAT_SESSIONS_TABLE,
    CREATE_CHAT_MESSAGES_TABLE,
    CREATE_SESSION_CLICKS_TABLE,
    CREATE_SESSION_MOVES_TABLE,
];

pub const SELECT_SYSTEM_PROMPT: &str = "SELECT g.global_prefix, p.system_prompt
     FROM personas p, global_prompts g
     WHERE p.persona_id = ? AND g.prompt_key = ?";

pub const UPSERT_SESSION: &str = "INSERT INTO chat_sessions (session_id, persona_id, metadata)
     VALUES (?, ?, ?)
     ON CONFLICT(session_id) DO UPDATE SET
        persona_id = excluded.persona_id,
        metadata = COALESCE(excluded.metadata, chat_sessions.metadata),
        updated_at = CURRENT_TIMESTAMP";

pub const SELECT_FIND_MEDIA: &str = "SELECT a.media_url, a.title, a.caption, a.syllabus_json
     FROM media_assets a
     JOIN media_asset_tags t ON t.asset_id = a.id
     WHERE a.media_type = ? AND t.tag = ?
     ORDER BY a.id ASC";

pub const SELECT_UPCOMING_CLASSES: &str = "SELECT course_name, course_location, course_length, start_date, registration_link
     FROM upcoming_classes
     WHERE start_date >= ?
     ORDER BY start_date ASC";

/// Formats a query vector as a `vector32(...)` SQL literal.
pub fn vector_literal(query_vector: &[f32]) -> String {
    format!(
        "vector32('[{}]')",
        query_vector
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Returns the cosine-similarity search over `training_data`.
pub fn match_training_chunks(query_vector: &[f32], limit: u32) -> String {
    let vector = vector_literal(query_vector);
    format!(
        "SELECT text, 1.0 - vector_distance_cos(embedding, {vector}) AS similarity
         FROM training_data
         WHERE embedding IS NOT NULL
         ORDER BY similarity DESC
         LIMIT {limit};"
    )
}

/// Returns the cosine-similarity search over `media_assets`, filtered by type (`?1`).
pub fn match_media_assets(query_vector: &[f32], limit: u32) -> String {
    let vector = vector_literal(query_vector);
    format!(
        "SELECT media_url, title, caption, syllabus_json, 1.0 - vector_distance_cos(embedding, {vector}) AS similarity
         FROM media_assets
         WHERE media_type = ? AND embedding IS NOT NULL
         ORDER BY similarity DESC
         LIMIT {limit};"
    )
}
