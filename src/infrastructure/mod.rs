//! Infrastructure layer module
//!
//! This module contains external integrations:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Upstream chat-completions client, rate limiting and retry
//! - Prompt template registry
//! - Structured-output JSON extraction
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod validators;
