//! Domain models.

pub mod config;
pub mod conversation;
pub mod generation;
pub mod persistence;
pub mod response;
pub mod strategy;
pub mod workspace;

pub use config::{
    CatalogConfig, Config, DatabaseConfig, LoggingConfig, ModelProfile, ModelsConfig,
    PipelineConfig, RateLimitConfig, RetryConfig, ServerConfig, UpstreamConfig,
};
pub use conversation::{serialize_turns, ConversationHistory, Role, Turn, ESCAPED_DELIMITER, TURN_DELIMITER};
pub use generation::{GenerationResult, PromptMessage, PromptRole};
pub use persistence::{Conversation, Message, MessageKind, NewMessage};
pub use response::{ResponseEnvelope, StreamEvent};
pub use strategy::{MultiStepReasoning, ReasoningStep, Strategy, StrategySelection};
pub use workspace::{Agent, AgentSpec, Task, TaskOutcome, TaskStatus, Tool, ToolSpec};
