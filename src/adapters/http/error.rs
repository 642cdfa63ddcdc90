//! Error bodies and status mapping for the HTTP API.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::errors::{DomainError, PipelineError};
use crate::services::ReplyError;

/// Error response structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Rejection type shared by every handler.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
        }),
    )
}

/// `MalformedHistory` is the caller's fault; everything else fatal is ours.
pub fn pipeline_error(err: PipelineError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!(code = err.code(), error = %err, "Pipeline request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    api_error(status, err.code(), err.to_string())
}

pub fn domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::ConversationNotFound(_) => api_error(StatusCode::NOT_FOUND, "CONVERSATION_NOT_FOUND", err.to_string()),
        DomainError::TaskNotFound(_) => api_error(StatusCode::NOT_FOUND, "TASK_NOT_FOUND", err.to_string()),
        DomainError::AgentNotFound(_) => api_error(StatusCode::NOT_FOUND, "AGENT_NOT_FOUND", err.to_string()),
        DomainError::ToolNotFound(_) => api_error(StatusCode::NOT_FOUND, "TOOL_NOT_FOUND", err.to_string()),
        DomainError::Unauthorized => api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string()),
        DomainError::ValidationFailed(ref reason) => {
            api_error(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", reason.clone())
        }
        DomainError::DatabaseError(_) | DomainError::SerializationError(_) => {
            error!(error = %err, "Persistence failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", err.to_string())
        }
    }
}

pub fn reply_error(err: ReplyError) -> ApiError {
    match err {
        ReplyError::Domain(err) => domain_error(err),
        ReplyError::Pipeline(err) => pipeline_error(err),
    }
}
