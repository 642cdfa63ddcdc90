//! Prompt messages sent upstream and the normalized generation result.

use serde::{Deserialize, Serialize};

/// Role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    Human,
    Ai,
}

impl PromptRole {
    /// Role name used by OpenAI-compatible chat APIs.
    pub const fn as_chat_role(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "user",
            Self::Ai => "assistant",
        }
    }
}

/// A rendered, role-tagged prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(PromptRole::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(PromptRole::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(PromptRole::Ai, content)
    }
}

/// What every upstream configuration maps its output into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    /// The upstream reported a natural stop rather than truncation
    pub stopped: bool,
}

impl GenerationResult {
    pub fn new(text: impl Into<String>, stopped: bool) -> Self {
        Self {
            text: text.into(),
            stopped,
        }
    }
}
