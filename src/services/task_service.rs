//! One-shot tasks answered by the strategy pipeline.
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{serialize_turns, Task, TaskOutcome, TaskStatus, Turn};
use crate::domain::ports::TaskRepository;
use crate::services::pipeline::StrategyPipeline;

/// Runs submitted requests through the pipeline and keeps the outcome.
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    pipeline: Arc<StrategyPipeline>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>, pipeline: Arc<StrategyPipeline>) -> Self {
        Self { repo, pipeline }
    }

    /// Store a task, answer it and record the result.
    ///
    /// A pipeline failure marks the task `Failed` with the error text as its
    /// result; only validation and persistence errors are returned.
    #[instrument(skip(self, request), err)]
    pub async fn submit(&self, user_id: &str, request: &str) -> DomainResult<Task> {
        let request = request.trim();
        if request.is_empty() {
            return Err(DomainError::ValidationFailed("Request is required".to_string()));
        }

        let mut task = self.repo.create_task(user_id, request).await?;
        let history = serialize_turns(&[Turn::user(request)]);

        let outcome = match self.pipeline.run_blocking_with_strategy(&history).await {
            Ok(reply) => TaskOutcome {
                status: TaskStatus::Completed,
                mode: Some(reply.strategy.display_name().to_string()),
                plan: (!reply.response.steps.is_empty()).then_some(reply.response.steps),
                result: Some(reply.response.message),
            },
            Err(err) => {
                warn!(task_id = task.id, error = %err, "Task failed");
                TaskOutcome {
                    status: TaskStatus::Failed,
                    mode: None,
                    plan: None,
                    result: Some(err.to_string()),
                }
            }
        };

        self.repo.finish_task(task.id, &outcome).await?;
        info!(task_id = task.id, status = outcome.status.as_str(), "Task finished");

        task.status = outcome.status;
        task.mode = outcome.mode;
        task.plan = outcome.plan;
        task.result = outcome.result;
        Ok(task)
    }

    pub async fn list(&self, user_id: &str) -> DomainResult<Vec<Task>> {
        self.repo.list_tasks(user_id).await
    }

    /// Fetch a task the caller owns; other users' tasks read as missing.
    pub async fn get(&self, user_id: &str, id: i64) -> DomainResult<Task> {
        self.repo
            .get_task(id)
            .await?
            .filter(|task| task.user_id == user_id)
            .ok_or(DomainError::TaskNotFound(id))
    }
}
