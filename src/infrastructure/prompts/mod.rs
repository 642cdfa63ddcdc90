//! Prompt template registry.

pub mod registry;

pub use registry::{names, PromptRegistry, TemplateFile, TemplatePart, DEFAULT_HEADER_VARIABLE};
