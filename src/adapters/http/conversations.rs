//! Conversation endpoints, scoped to the caller identity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{domain_error, reply_error, ApiResult};
use super::server::{AppState, CallerId};
use crate::domain::models::{Conversation, Message, NewMessage};

/// Conversation as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: i64,
    pub title: String,
    /// Creation time, RFC 3339
    pub date: String,
}

impl From<Conversation> for ConversationResponse {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            date: conversation.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<Vec<ConversationResponse>>> {
    let conversations = state.conversations.list(&user_id).await.map_err(domain_error)?;
    Ok(Json(conversations.into_iter().map(ConversationResponse::from).collect()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Json(request): Json<TitleRequest>,
) -> ApiResult<(StatusCode, Json<ConversationResponse>)> {
    let conversation = state
        .conversations
        .create(&user_id, &request.title)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(conversation.into())))
}

pub async fn messages(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.conversations.messages(&user_id, id).await.map_err(domain_error)?;
    Ok(Json(messages))
}

pub async fn add_message(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
    Json(message): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state
        .conversations
        .add_message(&user_id, id, &message)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn rename(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
    Json(request): Json<TitleRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = state
        .conversations
        .rename(&user_id, id, &request.title)
        .await
        .map_err(domain_error)?;
    Ok(Json(conversation.into()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
) -> ApiResult<Json<StatusMessage>> {
    state.conversations.delete(&user_id, id).await.map_err(domain_error)?;
    Ok(Json(StatusMessage {
        message: "Conversation deleted successfully".to_string(),
    }))
}

/// Run the blocking pipeline over the stored conversation and store the answer.
pub async fn reply(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state.conversations.reply(&user_id, id).await.map_err(reply_error)?;
    Ok((StatusCode::CREATED, Json(message)))
}
