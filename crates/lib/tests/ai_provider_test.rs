//! # AI Provider Tests
//!
//! Verifies the wire format of the chat and embedding providers against a mock
//! HTTP server.

use admitrag::{
    errors::PromptError,
    providers::{
        ai::{
            gemini::GeminiProvider, openai::OpenAiProvider, AiProvider, EmbeddingProvider,
            HttpEmbeddingProvider,
        },
        factory::create_ai_provider,
    },
    types::{ChatMessage, ProviderConfig},
};
use anyhow::Result;
use serde_json::json;
use wiremock::{
    matchers::{body_json, body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn request() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("BRAND.\n\nYou are a WFA assistant."),
        ChatMessage::user("Context:\nchunk\n\nQuestion: What is WFA?"),
    ]
}

#[tokio::test]
async fn test_openai_sends_messages_and_returns_first_choice() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "messages": [
                {"role": "system", "content": "BRAND.\n\nYou are a WFA assistant."},
                {"role": "user", "content": "Context:\nchunk\n\nQuestion: What is WFA?"}
            ],
            "model": "gpt-3.5-turbo",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "It's a cert. [SHOW_SYLLABUS]"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("sk-test".to_string()),
        Some("gpt-3.5-turbo".to_string()),
    )?;
    let reply = provider.complete(&request()).await?;

    assert_eq!(reply, "It's a cert. [SHOW_SYLLABUS]");
    Ok(())
}

#[tokio::test]
async fn test_openai_error_status_is_an_api_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(server.uri(), None, None)?;
    let err = provider.complete(&request()).await.unwrap_err();

    match err {
        PromptError::AiApi(message) => {
            assert!(message.contains("429"), "got: {message}");
            assert!(message.contains("rate limited"), "got: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_openai_without_choices_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(server.uri(), None, None)?;
    let err = provider.complete(&request()).await.unwrap_err();

    assert!(matches!(err, PromptError::AiApi(_)));
    Ok(())
}

#[tokio::test]
async fn test_gemini_moves_system_prompt_out_of_band() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-pro:generateContent"))
        .and(query_param("key", "g-key"))
        .and(body_json(json!({
            "systemInstruction": {"parts": [{"text": "BRAND.\n\nYou are a WFA assistant."}]},
            "contents": [
                {"role": "user", "parts": [{"text": "Context:\nchunk\n\nQuestion: What is WFA?"}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Gemini says hi"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        format!("{}/v1beta/models/gemini-pro:generateContent", server.uri()),
        "g-key".to_string(),
    )?;
    let reply = provider.complete(&request()).await?;

    assert_eq!(reply, "Gemini says hi");
    Ok(())
}

#[tokio::test]
async fn test_openai_embedding_request_shape() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-embed"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": "What is WFA?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.25, -0.5, 1.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = HttpEmbeddingProvider::new(
        format!("{}/v1/embeddings", server.uri()),
        "text-embedding-3-small".to_string(),
        Some("sk-embed".to_string()),
    )?;
    let vector = embedder.embed("What is WFA?").await?;

    assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    Ok(())
}

#[tokio::test]
async fn test_empty_embedding_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"input": "q"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": []}]})),
        )
        .mount(&server)
        .await;

    let embedder = HttpEmbeddingProvider::new(server.uri(), "m".to_string(), None)?;
    let err = embedder.embed("q").await.unwrap_err();

    assert!(matches!(err, PromptError::AiApi(ref m) if m.contains("empty vector")));
    Ok(())
}

#[test]
fn test_factory_rejects_unknown_provider() {
    let config = ProviderConfig {
        provider: "anthropomorphic".to_string(),
        api_url: None,
        api_key: None,
        model_name: "x".to_string(),
    };
    let err = create_ai_provider(&config).unwrap_err();
    assert!(matches!(err, PromptError::UnsupportedProvider(ref p) if p == "anthropomorphic"));
}

#[test]
fn test_factory_requires_gemini_key() {
    let config = ProviderConfig {
        provider: "gemini".to_string(),
        api_url: None,
        api_key: None,
        model_name: "gemini-pro".to_string(),
    };
    assert!(matches!(
        create_ai_provider(&config),
        Err(PromptError::MissingCollaborator(_))
    ));
}

#[tokio::test]
async fn test_factory_builds_openai_provider() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "from factory"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_ai_provider(&ProviderConfig {
        provider: "openai".to_string(),
        api_url: Some(server.uri()),
        api_key: None,
        model_name: "gpt-3.5-turbo".to_string(),
    })?;

    assert_eq!(provider.complete(&request()).await?, "from factory");
    Ok(())
}
