#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the library's integration tests. The mock collaborators
//! themselves live in `admitrag-test-utils`.

use admitrag::types::SystemPrompt;
use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const GLOBAL_PROMPT_KEY: &str = "brand_v1";

pub fn brand_prompt() -> SystemPrompt {
    SystemPrompt {
        global_prefix: "BRAND.".to_string(),
        persona_prompt: "You are a WFA assistant.".to_string(),
    }
}
