//! HTTP server exposing the pipeline, conversation, task and catalog API.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::catalog;
use super::conversations;
use super::error::{api_error, ApiError};
use super::llm;
use super::tasks;
use crate::domain::models::ServerConfig;
use crate::services::{CatalogService, ConversationService, PendingSessionStore, StrategyPipeline, TaskService};

/// Header carrying the caller identity set by the authenticating gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Configuration for the API HTTP server.
#[derive(Debug, Clone)]
pub struct ApiHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
    /// Heartbeat interval for SSE streams (milliseconds).
    pub heartbeat_interval_ms: u64,
    /// How long a two-phase streaming session waits for its read.
    pub session_ttl: Duration,
}

impl Default for ApiHttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for ApiHttpConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            session_ttl: Duration::from_secs(config.session_ttl_secs),
        }
    }
}

/// Shared state for the API server.
pub struct AppState {
    pub pipeline: Arc<StrategyPipeline>,
    pub conversations: Arc<ConversationService>,
    pub tasks: Arc<TaskService>,
    pub catalog: Arc<CatalogService>,
    pub sessions: PendingSessionStore,
    pub config: ApiHttpConfig,
}

impl AppState {
    pub fn new(
        pipeline: Arc<StrategyPipeline>,
        conversations: Arc<ConversationService>,
        tasks: Arc<TaskService>,
        catalog: Arc<CatalogService>,
        config: ApiHttpConfig,
    ) -> Self {
        Self {
            sessions: PendingSessionStore::new(config.session_ttl),
            pipeline,
            conversations,
            tasks,
            catalog,
            config,
        }
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.config.heartbeat_interval_ms)
    }
}

/// API HTTP server.
pub struct ApiHttpServer {
    state: Arc<AppState>,
}

impl ApiHttpServer {
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state) }
    }

    /// Build the router with all endpoints.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_check))
            .route("/llm", post(llm::respond))
            .route("/llm_stream", post(llm::stream))
            .route("/llm_stream/sessions", post(llm::open_session))
            .route("/llm_stream/sessions/{id}", get(llm::stream_session))
            .route(
                "/api/conversations",
                get(conversations::list).post(conversations::create),
            )
            .route("/api/conversations/{id}", delete(conversations::delete))
            .route(
                "/api/conversations/{id}/messages",
                get(conversations::messages).post(conversations::add_message),
            )
            .route("/api/conversations/{id}/title", put(conversations::rename))
            .route("/api/conversations/{id}/reply", post(conversations::reply))
            .route("/api/tasks", get(tasks::list).post(tasks::create))
            .route("/api/tasks/{id}", get(tasks::get))
            .route("/api/agents", get(catalog::list_agents))
            .route("/api/agents/{id}", get(catalog::get_agent))
            .route("/api/tools", get(catalog::list_tools))
            .route("/api/tools/{id}", get(catalog::get_tool))
            .with_state(Arc::clone(&self.state))
            .layer(TraceLayer::new_for_http());

        if self.state.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }

    /// Start the server.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.state.config.host, self.state.config.port).parse()?;
        let router = self.build_router();

        tracing::info!("API HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "prometheia",
    })
}

/// Caller identity taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Missing caller identity"))
    }
}
