//! Conversation service coordinating ownership checks, persistence and replies.
//!
//! Every operation is scoped to a caller identity; a conversation owned by
//! someone else is reported as `Unauthorized`, a missing one as not found.
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult, PipelineError};
use crate::domain::models::{serialize_turns, Conversation, Message, NewMessage, Turn};
use crate::domain::ports::ConversationRepository;
use crate::services::pipeline::StrategyPipeline;

/// Failure of [`ConversationService::reply`], which touches both persistence
/// and the pipeline.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Service for conversations and their messages.
pub struct ConversationService {
    repo: Arc<dyn ConversationRepository>,
    pipeline: Arc<StrategyPipeline>,
}

impl ConversationService {
    pub fn new(repo: Arc<dyn ConversationRepository>, pipeline: Arc<StrategyPipeline>) -> Self {
        Self { repo, pipeline }
    }

    pub async fn list(&self, user_id: &str) -> DomainResult<Vec<Conversation>> {
        self.repo.list_conversations(user_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn create(&self, user_id: &str, title: &str) -> DomainResult<Conversation> {
        let title = require_title(title)?;
        let conversation = self.repo.create_conversation(user_id, title).await?;
        info!(conversation_id = conversation.id, "Conversation created");
        Ok(conversation)
    }

    /// Fetch a conversation the caller owns.
    ///
    /// # Errors
    /// `ConversationNotFound` if absent, `Unauthorized` if owned by another user.
    pub async fn owned(&self, user_id: &str, id: i64) -> DomainResult<Conversation> {
        let conversation = self
            .repo
            .get_conversation(id)
            .await?
            .ok_or(DomainError::ConversationNotFound(id))?;

        if conversation.user_id != user_id {
            return Err(DomainError::Unauthorized);
        }
        Ok(conversation)
    }

    pub async fn messages(&self, user_id: &str, id: i64) -> DomainResult<Vec<Message>> {
        self.owned(user_id, id).await?;
        self.repo.list_messages(id).await
    }

    #[instrument(skip(self, message), fields(kind = message.kind.as_str()), err)]
    pub async fn add_message(&self, user_id: &str, id: i64, message: &NewMessage) -> DomainResult<Message> {
        self.owned(user_id, id).await?;
        if message.content.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Message content is required".to_string()));
        }
        self.repo.append_message(id, message).await
    }

    #[instrument(skip(self), err)]
    pub async fn rename(&self, user_id: &str, id: i64, title: &str) -> DomainResult<Conversation> {
        let mut conversation = self.owned(user_id, id).await?;
        let title = require_title(title)?;
        self.repo.update_title(id, title).await?;
        conversation.title = title.to_string();
        Ok(conversation)
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, user_id: &str, id: i64) -> DomainResult<()> {
        self.owned(user_id, id).await?;
        self.repo.delete_conversation(id).await?;
        info!(conversation_id = id, "Conversation deleted");
        Ok(())
    }

    /// Build the history from stored messages and return it in the turn grammar.
    pub async fn history(&self, user_id: &str, id: i64) -> DomainResult<String> {
        let turns: Vec<Turn> = self.messages(user_id, id).await?.iter().map(Message::to_turn).collect();
        Ok(serialize_turns(&turns))
    }

    /// Answer the conversation's latest user message and store the reply.
    ///
    /// # Errors
    /// Ownership and persistence failures as [`ReplyError::Domain`]; an empty
    /// conversation or one that does not end with a user message is a
    /// `MalformedHistory` pipeline error.
    #[instrument(skip(self), err)]
    pub async fn reply(&self, user_id: &str, id: i64) -> Result<Message, ReplyError> {
        let history = self.history(user_id, id).await?;
        let reply = self.pipeline.run_blocking_with_strategy(&history).await?;
        let new_message = NewMessage::ai(reply.response.message, reply.response.steps)
            .with_strategy(reply.strategy.display_name());

        let message = self.repo.append_message(id, &new_message).await?;
        info!(
            conversation_id = id,
            message_id = message.id,
            strategy = reply.strategy.as_str(),
            "Reply stored"
        );
        Ok(message)
    }
}

fn require_title(title: &str) -> DomainResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::ValidationFailed("Title is required".to_string()));
    }
    Ok(title)
}
