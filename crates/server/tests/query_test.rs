//! # Query Endpoint Tests
//!
//! Drives `POST /api/query` through the real router with mocked model endpoints.

mod common;

use anyhow::Result;
use common::{TestApp, CHAT_PATH, EMBEDDINGS_PATH};
use httpmock::Method;
use reqwest::StatusCode;
use serde_json::{json, Value};
use turso::Value as TursoValue;

async fn seed_training(app: &TestApp) -> Result<()> {
    app.db
        .insert_training_text("WFA is a certification.", Some(&[1.0, 0.0, 0.0]))
        .await?;
    app.db
        .insert_training_text("It takes 5 days.", Some(&[0.9, 0.1, 0.0]))
        .await?;
    app.db
        .insert_training_text("Classes run monthly.", Some(&[0.7, 0.3, 0.0]))
        .await?;
    app.db
        .insert_training_text("Parking is free.", Some(&[0.0, 0.0, 1.0]))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_wfa_question_end_to_end() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    let embedding_mock = app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    let chat_mock = app
        .mock_server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path(CHAT_PATH)
                .body_contains("BRAND.\\n\\nYou are a WFA assistant.")
                .body_contains(
                    "Context:\\nWFA is a certification.\\n\\nIt takes 5 days.\\n\\nClasses run monthly.\\n\\nQuestion: What is WFA?",
                );
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "It's a cert. [SHOW_SYLLABUS]"}}]
            }));
        })
        .await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "What is WFA?", "persona_id": "default"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"response": "It's a cert.", "trigger": "syllabus"}));
    embedding_mock.assert_hits_async(1).await;
    chat_mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_query_reaches_the_models_untrimmed() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    let embedding_mock = app
        .mock_server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path(EMBEDDINGS_PATH)
                .body_contains(r#""input":"  What is WFA?\n""#);
            then.status(200)
                .json_body(json!({"data": [{"embedding": [1.0, 0.0, 0.0]}]}));
        })
        .await;
    let chat_mock = app
        .mock_server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path(CHAT_PATH)
                .body_contains(r#"Question:   What is WFA?\n""#);
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "It's a cert."}}]
            }));
        })
        .await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "  What is WFA?\n"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    embedding_mock.assert_hits_async(1).await;
    chat_mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_persona_defaults_and_offer_args_are_returned() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    app.mock_chat("Enroll now! [SHOW_OFFER:early-bird, bundle]")
        .await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "Any discounts?"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({
            "response": "Enroll now!",
            "trigger": "offer",
            "trigger_args": ["early-bird", "bundle"]
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_plain_reply_has_null_trigger() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    app.mock_chat("Classes run monthly.").await;

    let body: Value = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "When are classes?", "persona_id": "default"}))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body, json!({"response": "Classes run monthly.", "trigger": null}));
    Ok(())
}

#[tokio::test]
async fn test_unknown_persona_is_404_without_model_calls() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    let embedding_mock = app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    let chat_mock = app.mock_chat("unused").await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "What is WFA?", "persona_id": "ghost"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"error": "No data found for persona 'ghost'."}));
    embedding_mock.assert_hits_async(0).await;
    chat_mock.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_no_training_data_is_422_without_completion() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    let chat_mock = app.mock_chat("unused").await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "What is WFA?"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({"error": "No relevant content found in training data."})
    );
    chat_mock.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_failing_chat_provider_is_502() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    let chat_mock = app
        .mock_server
        .mock_async(|when, then| {
            when.method(Method::POST).path(CHAT_PATH);
            then.status(503).body("overloaded");
        })
        .await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "What is WFA?"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await?;
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.contains("overloaded"), "got: {message}");
    chat_mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_failing_embedding_provider_is_502() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    app.mock_server
        .mock_async(|when, then| {
            when.method(Method::POST).path(common::EMBEDDINGS_PATH);
            then.status(401).body("invalid api key");
        })
        .await;
    let chat_mock = app.mock_chat("unused").await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "What is WFA?"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    chat_mock.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_missing_or_blank_query_is_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    for payload in [json!({"persona_id": "default"}), json!({"query": "   "})] {
        let response = app
            .client
            .post(app.url("/api/query"))
            .json(&payload)
            .send()
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload: {payload}");
        let body: Value = response.json().await?;
        assert!(body["error"].is_string(), "payload: {payload}");
    }
    Ok(())
}

#[tokio::test]
async fn test_session_is_upserted_and_exchange_recorded() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;
    seed_training(&app).await?;
    app.mock_embedding(&[1.0, 0.0, 0.0]).await;
    app.mock_chat("It's a cert. [SHOW_SYLLABUS]").await;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({
            "query": "What is WFA?",
            "session_id": "s-42",
            "metadata": {"browser": "Firefox", "utm_source": "newsletter", "geo": {"country": "US"}}
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.db.count_rows("chat_sessions").await?, 1);
    assert_eq!(app.db.count_rows("chat_messages").await?, 1);

    let conn = app.db.db.connect()?;
    let mut rows = conn
        .query(
            "SELECT query, response, visual_trigger FROM chat_messages WHERE session_id = 's-42'",
            (),
        )
        .await?;
    let row = rows.next().await?.expect("message row");
    assert!(matches!(row.get_value(0)?, TursoValue::Text(ref t) if t == "What is WFA?"));
    assert!(matches!(row.get_value(1)?, TursoValue::Text(ref t) if t == "It's a cert."));
    assert!(matches!(row.get_value(2)?, TursoValue::Text(ref t) if t == "syllabus"));
    Ok(())
}

#[tokio::test]
async fn test_failed_query_still_creates_session_but_no_exchange() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.seed_default_persona().await?;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "q", "persona_id": "ghost", "session_id": "s-7"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.db.count_rows("chat_sessions").await?, 1);
    assert_eq!(app.db.count_rows("chat_messages").await?, 0);
    Ok(())
}
