//! HTTP API (axum): pipeline endpoints with SSE streaming, conversations,
//! tasks and the agent/tool catalog.

pub mod catalog;
pub mod conversations;
pub mod error;
pub mod llm;
pub mod server;
pub mod tasks;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use llm::{PromptRequest, SessionResponse};
pub use server::{ApiHttpConfig, ApiHttpServer, AppState, CallerId, USER_ID_HEADER};
pub use tasks::{TaskCreated, TaskRequest, TaskResponse};
