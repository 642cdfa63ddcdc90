//! Conversation records owned by the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::{Role, Turn};
use super::strategy::ReasoningStep;

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Author of a stored message; serialized as the client's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
}

impl MessageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "ai" | "assistant" => Some(Self::Ai),
            _ => None,
        }
    }
}

impl From<MessageKind> for Role {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::User => Self::User,
            MessageKind::Ai => Self::Ai,
        }
    }
}

/// A stored message. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<ReasoningStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn to_turn(&self) -> Turn {
        Turn {
            role: self.kind.into(),
            content: self.content.clone(),
        }
    }
}

/// A message to append; the store assigns identity and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub steps: Option<Vec<ReasoningStep>>,
    #[serde(default)]
    pub strategy: Option<String>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::User,
            content: content.into(),
            steps: None,
            strategy: None,
        }
    }

    pub fn ai(content: impl Into<String>, steps: Vec<ReasoningStep>) -> Self {
        Self {
            kind: MessageKind::Ai,
            content: content.into(),
            steps: Some(steps),
            strategy: None,
        }
    }

    /// Record the strategy that produced this message.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}
