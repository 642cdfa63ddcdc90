use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskOutcome};

/// Repository interface for submitted tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Store a new `Pending` task for a user.
    async fn create_task(&self, user_id: &str, request: &str) -> DomainResult<Task>;

    /// Record the final status of a task.
    async fn finish_task(&self, id: i64, outcome: &TaskOutcome) -> DomainResult<()>;

    async fn get_task(&self, id: i64) -> DomainResult<Option<Task>>;

    /// Tasks owned by a user, newest first.
    async fn list_tasks(&self, user_id: &str) -> DomainResult<Vec<Task>>;
}
