//! Common test utilities for integration tests
//!
//! Provides scripted pipelines and stream helpers shared by the
//! integration test files.

#![allow(dead_code)]

use futures::StreamExt;
use std::sync::Arc;

use prometheia::adapters::generators::{ScriptedGenerator, ScriptedReply};
use prometheia::domain::models::{ModelsConfig, RetryConfig, StreamEvent};
use prometheia::infrastructure::prompts::PromptRegistry;
use prometheia::services::{PipelineEventStream, StrategyPipeline};

pub const FAST: &str = "fast";
pub const QUALITY: &str = "quality";
pub const STRUCTURED: &str = "structured";

/// Retries with millisecond backoff so tests stay fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 1,
        min_backoff_ms: 1,
        max_backoff_ms: 5,
    }
}

/// A pipeline over the built-in templates and the given generator.
pub fn pipeline(generator: &ScriptedGenerator) -> Arc<StrategyPipeline> {
    let registry = PromptRegistry::builtin().expect("built-in templates load");
    Arc::new(StrategyPipeline::new(
        Arc::new(generator.clone()),
        Arc::new(registry),
        &ModelsConfig::default(),
        &fast_retry(),
        3,
    ))
}

/// A one-turn conversation.
pub fn single_turn(message: &str) -> String {
    format!("###USER###\n{message}\n###END###\n")
}

pub fn selection_json(strategy: i64) -> String {
    format!(r#"{{"rationale": "Picked for the test.", "strategy": {strategy}}}"#)
}

pub fn reasoning_json() -> String {
    r#"{"steps": [
        {"step": "Understand", "explanation": "Restate the question"},
        {"step": "Compare", "explanation": "Weigh the options"},
        {"step": "Conclude", "explanation": "Pick the best option"}
    ]}"#
    .to_string()
}

/// Script the two fast-profile calls and the strategy selection.
pub fn script_preamble(generator: &ScriptedGenerator, strategy: i64) {
    generator.push(FAST, ScriptedReply::text("- the user likes concise answers"));
    generator.push(FAST, ScriptedReply::text("get a quick answer"));
    generator.push(STRUCTURED, ScriptedReply::text(selection_json(strategy)));
}

pub async fn collect(stream: PipelineEventStream) -> Vec<StreamEvent> {
    stream.collect().await
}

/// Concatenated `content` payloads.
pub fn content_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Content(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::kind).collect()
}
