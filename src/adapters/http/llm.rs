//! Pipeline endpoints: blocking, streaming and two-phase streaming.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::error::{pipeline_error, ApiResult};
use super::server::AppState;
use crate::domain::models::{ResponseEnvelope, StreamEvent};
use crate::services::PipelineEventStream;

/// Body of the pipeline endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Conversation history in the turn grammar.
    pub prompt: String,
    /// Conversation the prompt belongs to; used for correlation only.
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// Blocking pipeline run.
#[instrument(skip_all, fields(conversation_id = ?request.conversation_id))]
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> ApiResult<Json<ResponseEnvelope>> {
    let response = state
        .pipeline
        .run_blocking(&request.prompt)
        .await
        .map_err(pipeline_error)?;
    Ok(Json(response))
}

/// Streaming pipeline run as server-sent events.
#[instrument(skip_all, fields(conversation_id = ?request.conversation_id))]
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let events = state.pipeline.run_streaming(&request.prompt).map_err(pipeline_error)?;
    Ok(sse_response(&state, events))
}

/// First phase of a two-phase stream: park the prompt, return a session id.
#[instrument(skip_all, fields(conversation_id = ?request.conversation_id))]
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> (StatusCode, Json<SessionResponse>) {
    let session_id = state.sessions.open(request.conversation_id, request.prompt).await;
    info!(%session_id, "Streaming session opened");
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

/// Second phase: claim the parked prompt and stream its run.
#[instrument(skip(state), fields(conversation_id = ?query.conversation_id))]
pub async fn stream_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let prompt = state
        .sessions
        .claim(session_id, query.conversation_id)
        .await
        .map_err(pipeline_error)?;
    let events = state.pipeline.run_streaming(&prompt).map_err(pipeline_error)?;
    Ok(sse_response(&state, events))
}

/// Each event becomes one `data: <json>` frame.
fn sse_response(
    state: &AppState,
    events: PipelineEventStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = events.map(|event: StreamEvent| Ok(Event::default().data(event.to_json())));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.heartbeat()))
}
