//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - TextGenerator: upstream LLM text generation, whole or streamed
//! - ConversationRepository: conversation and message persistence
//! - TaskRepository: one-shot tasks and their outcomes
//! - CatalogRepository: registered agents and tools

pub mod catalog_repository;
pub mod conversation_repository;
pub mod task_repository;
pub mod text_generator;

pub use catalog_repository::CatalogRepository;
pub use conversation_repository::ConversationRepository;
pub use task_repository::TaskRepository;
pub use text_generator::{FragmentStream, TextGenerator};
