use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Conversation, Message, NewMessage};

/// Repository interface for conversation and message persistence.
///
/// Lookups are not scoped by user; ownership checks belong to the caller.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Create a conversation and return it with its assigned id.
    async fn create_conversation(&self, user_id: &str, title: &str) -> DomainResult<Conversation>;

    async fn get_conversation(&self, id: i64) -> DomainResult<Option<Conversation>>;

    /// Conversations owned by a user, newest first.
    async fn list_conversations(&self, user_id: &str) -> DomainResult<Vec<Conversation>>;

    async fn update_title(&self, id: i64, title: &str) -> DomainResult<()>;

    /// Delete a conversation and all of its messages.
    async fn delete_conversation(&self, id: i64) -> DomainResult<()>;

    /// Append a message; identity and timestamp are assigned atomically by the store.
    async fn append_message(&self, conversation_id: i64, message: &NewMessage) -> DomainResult<Message>;

    /// Messages in insertion order.
    async fn list_messages(&self, conversation_id: i64) -> DomainResult<Vec<Message>>;
}
