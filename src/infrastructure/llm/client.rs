use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client as ReqwestClient, Response};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::rate_limiter::UpstreamRateLimiter;
use super::streaming::SseFragmentStream;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, FINISH_REASON_STOP};
use crate::domain::errors::UpstreamError;
use crate::domain::models::{GenerationResult, ModelProfile, PromptMessage, UpstreamConfig};
use crate::domain::ports::{FragmentStream, TextGenerator};

/// Configuration for the chat-completions client
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Base URL up to and including the API version, e.g. `https://api.groq.com/openai/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl From<&UpstreamConfig> for ChatClientConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.resolve_api_key(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
///
/// One instance serves all model profiles. Calls are rate limited; retry
/// is left to the caller.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http_client: ReqwestClient,
    base_url: String,
    rate_limiter: UpstreamRateLimiter,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatClientConfig, rate_limiter: UpstreamRateLimiter) -> Result<Self, UpstreamError> {
        let key_state = if config.api_key.is_some() { "[REDACTED]" } else { "<unset>" };
        info!(
            "Initializing chat completions client: base_url={}, timeout={}s, api_key={}",
            config.base_url, config.timeout_secs, key_state
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| UpstreamError::InvalidRequest(format!("Invalid API key: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()
            .map_err(UpstreamError::from)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, request: &ChatCompletionRequest) -> Result<Response, UpstreamError> {
        self.rate_limiter.acquire().await;

        let url = self.endpoint();
        debug!("POST {}", url);

        let response = self.http_client.post(&url).json(request).send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::classify_error_response(response).await)
        }
    }

    /// Handle error response and classify error type
    async fn classify_error_response(response: Response) -> UpstreamError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        warn!("Upstream API error ({}): {}", status, body);
        UpstreamError::from_status(status.as_u16(), body)
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    #[instrument(skip(self, messages), fields(profile = %profile.name, model = %profile.model))]
    async fn generate(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<GenerationResult, UpstreamError> {
        let request = ChatCompletionRequest::from_prompt(profile, messages, false);
        let response = self.post(&request).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if let Some(usage) = body.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation succeeded"
            );
        }

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Decode("response contained no choices".to_string()))?;

        Ok(GenerationResult::new(
            choice.message.content,
            choice.finish_reason.as_deref() == Some(FINISH_REASON_STOP),
        ))
    }

    #[instrument(skip(self, messages), fields(profile = %profile.name, model = %profile.model))]
    async fn stream(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<FragmentStream, UpstreamError> {
        let request = ChatCompletionRequest::from_prompt(profile, messages, true);
        let response = self.post(&request).await?;

        Ok(SseFragmentStream::new(response.bytes_stream()).boxed())
    }
}
