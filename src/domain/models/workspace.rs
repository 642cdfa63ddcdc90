//! Tasks submitted by users, and the catalog of agents and tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::strategy::ReasoningStep;

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A one-shot request answered by the pipeline and kept for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub request: String,
    pub status: TaskStatus,
    /// Display name of the strategy that handled the request
    pub mode: Option<String>,
    pub plan: Option<Vec<ReasoningStep>>,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final state written back once the pipeline has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub mode: Option<String>,
    pub plan: Option<Vec<ReasoningStep>>,
    pub result: Option<String>,
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Catalog entry for an agent, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// A registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub api_endpoint: Option<String>,
}

/// Catalog entry for a tool, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}
