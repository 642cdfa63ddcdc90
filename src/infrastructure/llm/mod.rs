//! Upstream LLM integration
//!
//! An OpenAI-compatible chat-completions client with SSE fragment parsing,
//! a shared token-bucket rate limiter and the transient-failure retry policy.

pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod streaming;
pub mod types;

pub use client::{ChatClientConfig, ChatCompletionsClient};
pub use rate_limiter::UpstreamRateLimiter;
pub use retry::RetryPolicy;
pub use streaming::{parse_sse_frame, SseFragmentStream, SseFrame};
