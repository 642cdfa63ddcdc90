//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_optional_json};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskOutcome, TaskStatus};
use crate::domain::ports::TaskRepository;

const TASK_COLUMNS: &str = "id, user_id, request, status, mode, plan, result, created_at";

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create_task(&self, user_id: &str, request: &str) -> DomainResult<Task> {
        let created_at = Utc::now();
        let result = sqlx::query("INSERT INTO tasks (user_id, request, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(request)
            .bind(TaskStatus::Pending.as_str())
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(Task {
            id: result.last_insert_rowid(),
            user_id: user_id.to_string(),
            request: request.to_string(),
            status: TaskStatus::Pending,
            mode: None,
            plan: None,
            result: None,
            created_at,
        })
    }

    async fn finish_task(&self, id: i64, outcome: &TaskOutcome) -> DomainResult<()> {
        let plan_json = outcome.plan.as_ref().map(serde_json::to_string).transpose()?;

        let result = sqlx::query("UPDATE tasks SET status = ?, mode = ?, plan = ?, result = ? WHERE id = ?")
            .bind(outcome.status.as_str())
            .bind(&outcome.mode)
            .bind(&plan_json)
            .bind(&outcome.result)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }
        Ok(())
    }

    async fn get_task(&self, id: i64) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_tasks(&self, user_id: &str) -> DomainResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    user_id: String,
    request: String,
    status: String,
    mode: Option<String>,
    plan: Option<String>,
    result: Option<String>,
    created_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::parse(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid task status: {}", row.status)))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            request: row.request,
            status,
            mode: row.mode,
            plan: parse_optional_json(row.plan)?,
            result: row.result,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
