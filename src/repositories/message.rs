//! MessageRepository - Repository per la gestione dei messaggi

use super::{ChatRepository, Create, Read};
use crate::dtos::CreateMessageDTO;
use crate::entities::{IdType, Message};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};
use tracing::{debug, info, instrument};

const MESSAGE_COLUMNS: &str = "message_id, chat_id, sender_id, text, created_at, is_read";

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Get a page of messages for a chat, newest first.
    ///
    /// - `before_date` is None: the most recent `limit` messages
    /// - `before_date` is Some: `limit` messages strictly older than that date
    ///
    /// Equal timestamps fall back to insertion order (message_id).
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn find_many_paginated(
        &self,
        chat_id: &IdType,
        before_date: Option<&DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        let messages = if let Some(before) = before_date {
            sqlx::query_as::<_, Message>(&format!(
                r#"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE chat_id = ? AND created_at < ?
                ORDER BY created_at DESC, message_id DESC
                LIMIT ?
                "#
            ))
            .bind(chat_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        } else {
            sqlx::query_as::<_, Message>(&format!(
                r#"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE chat_id = ?
                ORDER BY created_at DESC, message_id DESC
                LIMIT ?
                "#
            ))
            .bind(chat_id)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        };

        debug!("Loaded {} messages", messages.len());
        Ok(messages)
    }

    /// Flips a single message to read. Returns `true` only for the call that
    /// performed the transition.
    #[instrument(skip(self), fields(message_id = %id))]
    pub async fn mark_read(&self, id: &IdType) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE messages SET is_read = 1 WHERE message_id = ? AND is_read = 0")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Flips many messages to read with a single statement and returns the
    /// ids that were actually unread before.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn mark_read_many(&self, ids: &[IdType]) -> Result<Vec<IdType>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            sqlx::QueryBuilder::new("UPDATE messages SET is_read = 1 WHERE is_read = 0 AND message_id IN (");
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") RETURNING message_id");

        let flipped = query_builder
            .build_query_scalar::<IdType>()
            .fetch_all(&self.connection_pool)
            .await?;

        debug!("Marked {} messages as read", flipped.len());
        Ok(flipped)
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    /// Inserts the message and moves the chat's last-message cache in the same
    /// transaction, so a stored message is never missing from the cache.
    #[instrument(skip(self, data), fields(chat_id = %data.chat_id, sender_id = %data.sender_id))]
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (chat_id, sender_id, text, created_at, is_read)
            VALUES (?, ?, ?, ?, 0)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(data.chat_id)
        .bind(data.sender_id)
        .bind(&data.text)
        .bind(data.created_at)
        .fetch_one(&mut *tx)
        .await?;

        ChatRepository::update_last_message_with(
            &mut *tx,
            &message.chat_id,
            &message.text,
            &message.created_at,
        )
        .await?;

        tx.commit().await?;

        info!("Message stored with id {}", message.message_id);
        Ok(message)
    }
}

impl Read<Message, IdType> for MessageRepository {
    #[instrument(skip(self), fields(message_id = %id))]
    async fn read(&self, id: &IdType) -> Result<Option<Message>, Error> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }
}
