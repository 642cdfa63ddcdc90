//! Text generator port - interface for upstream LLM backends.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::errors::UpstreamError;
use crate::domain::models::{GenerationResult, ModelProfile, PromptMessage};

/// Incremental text fragments from one generation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Trait for upstream text generators.
///
/// One implementation serves every model profile; the profile passed per
/// call selects model and sampling. Implementations do not retry; callers
/// wrap calls in a retry policy.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Implementation name for logs.
    fn name(&self) -> &'static str;

    /// Generate a complete result.
    async fn generate(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<GenerationResult, UpstreamError>;

    /// Open a fragment stream.
    ///
    /// Errors returned here happened while establishing the stream; errors
    /// yielded by the stream happened mid-generation.
    async fn stream(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<FragmentStream, UpstreamError>;
}
