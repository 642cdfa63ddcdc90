//! Read access to the agent and tool catalog, seeded from configuration.
use std::sync::Arc;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, CatalogConfig, Tool};
use crate::domain::ports::CatalogRepository;

pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Register every configured agent and tool, updating existing entries by name.
    pub async fn seed(&self, config: &CatalogConfig) -> DomainResult<()> {
        for spec in &config.agents {
            self.repo.upsert_agent(spec).await?;
        }
        for spec in &config.tools {
            self.repo.upsert_tool(spec).await?;
        }
        info!(agents = config.agents.len(), tools = config.tools.len(), "Catalog seeded");
        Ok(())
    }

    pub async fn agents(&self) -> DomainResult<Vec<Agent>> {
        self.repo.list_agents().await
    }

    pub async fn agent(&self, id: i64) -> DomainResult<Agent> {
        self.repo.get_agent(id).await?.ok_or(DomainError::AgentNotFound(id))
    }

    pub async fn tools(&self) -> DomainResult<Vec<Tool>> {
        self.repo.list_tools().await
    }

    pub async fn tool(&self, id: i64) -> DomainResult<Tool> {
        self.repo.get_tool(id).await?.ok_or(DomainError::ToolNotFound(id))
    }
}
