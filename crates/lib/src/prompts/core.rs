//! # Default Prompt Templates
//!
//! This module contains the default prompt templates used by the `QueryPipeline`
//! and the media matcher. The directive instructions can be overridden through the
//! `pipeline.directive_instructions` setting of `admitrag-server`.

/// Separator between the global prefix, the persona prompt, and the directive instructions.
pub const PROMPT_SEPARATOR: &str = "\n\n";

/// Separator between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The default instruction suffix telling the model when to emit directive markers.
pub const DEFAULT_DIRECTIVE_INSTRUCTIONS: &str = r#"# Visual Directives
You may ask the page to show a visual next to your answer by adding ONE marker at the very end of your reply:
- `[SHOW_SLIDESHOW]` when the user asks what the program or campus looks like.
- `[SHOW_SYLLABUS]` when the user asks about course content, modules, or certifications.
- `[SHOW_VIDEO]` when the user asks for an overview or a walkthrough.
- `[SHOW_OFFER:<item>,<item>]` when the user asks about pricing, discounts, or enrollment offers.
Only use a marker when it clearly helps. Never explain the marker."#;

/// The user message sent alongside the composed system prompt.
pub fn context_user_prompt(context: &str, query: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}

/// The text embedded for a semantic media lookup.
pub fn media_query(media_type: &str, tag: &str) -> String {
    format!("{media_type} for {tag} course")
}
