/// Request and response types for OpenAI-compatible chat completions
use serde::{Deserialize, Serialize};

use crate::domain::models::{ModelProfile, PromptMessage};

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g., "llama-3.1-8b-instant")
    pub model: String,

    pub messages: Vec<ChatMessage>,

    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Build a request for a profile from rendered prompt messages.
    pub fn from_prompt(profile: &ModelProfile, messages: &[PromptMessage], stream: bool) -> Self {
        Self {
            model: profile.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
            stream,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&PromptMessage> for ChatMessage {
    fn from(message: &PromptMessage) -> Self {
        Self {
            role: message.role.as_chat_role().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Non-streaming response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// One `data:` payload of a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Finish reason reported for a natural end of generation
pub const FINISH_REASON_STOP: &str = "stop";
