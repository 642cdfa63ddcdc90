use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentSpec, Tool, ToolSpec};

/// Repository interface for the shared agent and tool catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert an agent, or update the one with the same name.
    async fn upsert_agent(&self, spec: &AgentSpec) -> DomainResult<Agent>;

    async fn get_agent(&self, id: i64) -> DomainResult<Option<Agent>>;

    async fn list_agents(&self) -> DomainResult<Vec<Agent>>;

    /// Insert a tool, or update the one with the same name.
    async fn upsert_tool(&self, spec: &ToolSpec) -> DomainResult<Tool>;

    async fn get_tool(&self, id: i64) -> DomainResult<Option<Tool>>;

    async fn list_tools(&self) -> DomainResult<Vec<Tool>>;
}
