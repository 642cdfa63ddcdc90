//! PrometheiA - strategy-selecting conversational backend
//!
//! PrometheiA answers a chat conversation by first condensing its history,
//! inferring what the user wants, and letting a classifier pick one of four
//! answering strategies. Answers are returned whole or streamed as events.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, the error taxonomy and port traits
//! - **Service Layer** (`services`): The strategy pipeline and conversation use cases
//! - **Infrastructure Layer** (`infrastructure`): Upstream client, config, logging, prompts
//! - **Adapters** (`adapters`): HTTP API, SQLite persistence and scripted generators
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use prometheia::cli::bootstrap::{build_generator, build_pipeline};
//! use prometheia::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let pipeline = build_pipeline(&config, build_generator(&config, true)?)?;
//!     let reply = pipeline.run_blocking("###USER###\nHello\n###END###\n").await?;
//!     println!("{}", reply.message);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, PipelineError, UpstreamError};
pub use domain::models::{
    Config, ConversationHistory, ReasoningStep, ResponseEnvelope, Strategy, StrategySelection,
    StreamEvent, Turn,
};
pub use domain::ports::{ConversationRepository, TextGenerator};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConversationService, StrategyPipeline};
