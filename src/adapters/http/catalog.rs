//! Read-only agent and tool catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::error::{domain_error, ApiResult};
use super::server::{AppState, CallerId};
use crate::domain::models::{Agent, Tool};

pub async fn list_agents(State(state): State<Arc<AppState>>, _caller: CallerId) -> ApiResult<Json<Vec<Agent>>> {
    state.catalog.agents().await.map(Json).map_err(domain_error)
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    _caller: CallerId,
    Path(id): Path<i64>,
) -> ApiResult<Json<Agent>> {
    state.catalog.agent(id).await.map(Json).map_err(domain_error)
}

pub async fn list_tools(State(state): State<Arc<AppState>>, _caller: CallerId) -> ApiResult<Json<Vec<Tool>>> {
    state.catalog.tools().await.map(Json).map_err(domain_error)
}

pub async fn get_tool(
    State(state): State<Arc<AppState>>,
    _caller: CallerId,
    Path(id): Path<i64>,
) -> ApiResult<Json<Tool>> {
    state.catalog.tool(id).await.map(Json).map_err(domain_error)
}
