//! Domain layer for the PrometheiA backend
//!
//! This module contains core models, the error taxonomy and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, PipelineError, PipelineResult, TemplateError, UpstreamError};
