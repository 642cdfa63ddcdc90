//! Units returned by the pipeline in blocking and streaming mode.

use serde::{Deserialize, Serialize};

use super::strategy::ReasoningStep;

/// Whole response returned by blocking mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub message: String,
    #[serde(default)]
    pub steps: Vec<ReasoningStep>,
}

impl ResponseEnvelope {
    pub fn new(message: impl Into<String>, steps: Vec<ReasoningStep>) -> Self {
        Self {
            message: message.into(),
            steps,
        }
    }
}

/// One event of a streamed response.
///
/// Serializes as `{"type": "...", "data": ...}`; `End` carries no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A progress or reasoning step
    Steps(ReasoningStep),
    /// Display name of the selected strategy
    Strategy(String),
    /// A fragment of the final answer
    Content(String),
    /// A recovered condition the user should know about
    Warning(String),
    /// A fatal failure; always followed by `End`
    Error(String),
    /// Terminates every stream
    End,
}

impl StreamEvent {
    pub fn step(step: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self::Steps(ReasoningStep::new(step, explanation))
    }

    /// Short kind name, matching the serialized `type` field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Steps(_) => "steps",
            Self::Strategy(_) => "strategy",
            Self::Content(_) => "content",
            Self::Warning(_) => "warning",
            Self::Error(_) => "error",
            Self::End => "end",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }

    /// JSON payload of the event.
    pub fn to_json(&self) -> String {
        // plain strings and string-only structs cannot fail to serialize
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error","data":"serialization failed"}"#.to_string())
    }

    /// Event in the `data: <json>\n\n` wire shape.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}
