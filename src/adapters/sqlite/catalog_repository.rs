//! SQLite implementation of the CatalogRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentSpec, Tool, ToolSpec};
use crate::domain::ports::CatalogRepository;

#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn upsert_agent(&self, spec: &AgentSpec) -> DomainResult<Agent> {
        let row: AgentRow = sqlx::query_as(
            "INSERT INTO agents (name, kind, description) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET kind = excluded.kind, description = excluded.description
             RETURNING id, name, kind, description",
        )
        .bind(&spec.name)
        .bind(&spec.kind)
        .bind(&spec.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_agent(&self, id: i64) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT id, name, kind, description FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_agents(&self) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT id, name, kind, description FROM agents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_tool(&self, spec: &ToolSpec) -> DomainResult<Tool> {
        let row: ToolRow = sqlx::query_as(
            "INSERT INTO tools (name, description, api_endpoint) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET description = excluded.description, api_endpoint = excluded.api_endpoint
             RETURNING id, name, description, api_endpoint",
        )
        .bind(&spec.name)
        .bind(&spec.description)
        .bind(&spec.api_endpoint)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_tool(&self, id: i64) -> DomainResult<Option<Tool>> {
        let row: Option<ToolRow> = sqlx::query_as("SELECT id, name, description, api_endpoint FROM tools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_tools(&self) -> DomainResult<Vec<Tool>> {
        let rows: Vec<ToolRow> = sqlx::query_as("SELECT id, name, description, api_endpoint FROM tools ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: i64,
    name: String,
    kind: String,
    description: String,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            kind: row.kind,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ToolRow {
    id: i64,
    name: String,
    description: String,
    api_endpoint: Option<String>,
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            api_endpoint: row.api_endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_test_pool, ensure_schema};

    async fn setup_test_repo() -> SqliteCatalogRepository {
        let pool = create_test_pool().await.unwrap();
        ensure_schema(&pool).await.unwrap();
        SqliteCatalogRepository::new(pool)
    }

    fn agent(name: &str, description: &str) -> AgentSpec {
        AgentSpec {
            name: name.to_string(),
            kind: "planner".to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_agent_updates_by_name() {
        let repo = setup_test_repo().await;
        let first = repo.upsert_agent(&agent("scout", "Finds things")).await.unwrap();
        let second = repo.upsert_agent(&agent("scout", "Finds more things")).await.unwrap();

        assert_eq!(first.id, second.id);
        let agents = repo.list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].description, "Finds more things");
        assert_eq!(repo.get_agent(first.id).await.unwrap(), Some(second));
        assert!(repo.get_agent(first.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tools_keep_endpoint() {
        let repo = setup_test_repo().await;
        let weather = repo
            .upsert_tool(&ToolSpec {
                name: "weather".to_string(),
                description: "Forecasts".to_string(),
                api_endpoint: Some("https://weather.test/api".to_string()),
            })
            .await
            .unwrap();
        repo.upsert_tool(&ToolSpec {
            name: "calculator".to_string(),
            description: "Arithmetic".to_string(),
            api_endpoint: None,
        })
        .await
        .unwrap();

        let tools = repo.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["weather", "calculator"]);
        let fetched = repo.get_tool(weather.id).await.unwrap().unwrap();
        assert_eq!(fetched.api_endpoint.as_deref(), Some("https://weather.test/api"));
    }
}
