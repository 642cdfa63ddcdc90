pub mod catalog_service;
pub mod conversation_service;
pub mod pipeline;
pub mod session_bridge;
pub mod structured_output;
pub mod task_service;

pub use catalog_service::CatalogService;
pub use conversation_service::{ConversationService, ReplyError};
pub use pipeline::{BlockingReply, PipelineEventStream, PipelineStage, StrategyPipeline};
pub use session_bridge::{PendingSession, PendingSessionStore};
pub use structured_output::{StructuredOutputParser, StructuredRecord};
pub use task_service::TaskService;
