//! SQLite implementation of the ConversationRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_optional_json};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Conversation, Message, MessageKind, NewMessage};
use crate::domain::ports::ConversationRepository;

const CONVERSATION_COLUMNS: &str = "id, user_id, title, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, kind, content, steps, strategy, timestamp";

#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(&self, user_id: &str, title: &str) -> DomainResult<Conversation> {
        let created_at = Utc::now();
        let result = sqlx::query("INSERT INTO conversations (user_id, title, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(title)
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(Conversation {
            id: result.last_insert_rowid(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at,
        })
    }

    async fn get_conversation(&self, id: i64) -> DomainResult<Option<Conversation>> {
        let row: Option<ConversationRow> =
            sqlx::query_as(&format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_conversations(&self, user_id: &str) -> DomainResult<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_title(&self, id: i64, title: &str) -> DomainResult<()> {
        let result = sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn delete_conversation(&self, id: i64) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConversationNotFound(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_message(&self, conversation_id: i64, message: &NewMessage) -> DomainResult<Message> {
        let steps_json = message.steps.as_ref().map(serde_json::to_string).transpose()?;
        let timestamp = Utc::now();

        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DomainError::ConversationNotFound(conversation_id));
        }

        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, kind, content, steps, strategy, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(&steps_json)
        .bind(&message.strategy)
        .bind(timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Message {
            id: result.last_insert_rowid(),
            conversation_id,
            kind: message.kind,
            content: message.content.clone(),
            steps: message.steps.clone(),
            strategy: message.strategy.clone(),
            timestamp,
        })
    }

    async fn list_messages(&self, conversation_id: i64) -> DomainResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY id"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    user_id: String,
    title: String,
    created_at: String,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = DomainError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    kind: String,
    content: String,
    steps: Option<String>,
    strategy: Option<String>,
    timestamp: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let kind = MessageKind::parse(&row.kind)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid message kind: {}", row.kind)))?;

        Ok(Self {
            id: row.id,
            conversation_id: row.conversation_id,
            kind,
            content: row.content,
            steps: parse_optional_json(row.steps)?,
            strategy: row.strategy,
            timestamp: parse_datetime(&row.timestamp)?,
        })
    }
}
