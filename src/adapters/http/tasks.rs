//! Task endpoints, scoped to the caller identity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{domain_error, ApiResult};
use super::server::{AppState, CallerId};
use crate::domain::models::{ReasoningStep, Task, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub request: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: i64,
}

/// Task as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i64,
    pub request: String,
    pub status: TaskStatus,
    pub mode: Option<String>,
    pub plan: Option<Vec<ReasoningStep>>,
    pub result: Option<String>,
    /// Creation time, RFC 3339
    pub date: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            request: task.request,
            status: task.status,
            mode: task.mode,
            plan: task.plan,
            result: task.result,
            date: task.created_at.to_rfc3339(),
        }
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Json(request): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskCreated>)> {
    let task = state.tasks.submit(&user_id, &request.request).await.map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(TaskCreated { task_id: task.id })))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state.tasks.list(&user_id).await.map_err(domain_error)?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.tasks.get(&user_id, id).await.map_err(domain_error)?;
    Ok(Json(task.into()))
}
