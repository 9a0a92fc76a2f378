//! ChatRepository - Repository per la gestione delle chat

use super::{Create, Read};
use crate::dtos::CreateChatDTO;
use crate::entities::{Chat, IdType};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

const CHAT_COLUMNS: &str =
    "chat_id, user1_id, user2_id, created_at, last_message, last_message_time";

// CHAT REPOSITORY
pub struct ChatRepository {
    connection_pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Get the chat between two users (if exists), whatever the order of the pair
    #[instrument(skip(self), fields(user1 = %user1_id, user2 = %user2_id))]
    pub async fn find_by_participants(
        &self,
        user1_id: &IdType,
        user2_id: &IdType,
    ) -> Result<Option<Chat>, Error> {
        debug!("Finding chat between two users");
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS} FROM chats
            WHERE (user1_id = ? AND user2_id = ?)
               OR (user1_id = ? AND user2_id = ?)
            "#
        ))
        .bind(user1_id)
        .bind(user2_id)
        .bind(user2_id)
        .bind(user1_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(chat)
    }

    /// All chats of a user, most recent activity first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_many_by_user_id(&self, user_id: &IdType) -> Result<Vec<Chat>, Error> {
        let chats = sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS} FROM chats
            WHERE user1_id = ? OR user2_id = ?
            ORDER BY last_message_time DESC, created_at DESC, chat_id DESC
            "#
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        debug!("User is part of {} chats", chats.len());
        Ok(chats)
    }

    /// Overwrites the cached last message, but only if `sent_at` is not older
    /// than what is already cached. Returns whether the cache moved.
    #[instrument(skip(self, text), fields(chat_id = %chat_id))]
    pub async fn update_last_message(
        &self,
        chat_id: &IdType,
        text: &str,
        sent_at: &DateTime<Utc>,
    ) -> Result<bool, Error> {
        let mut conn = self.connection_pool.acquire().await?;
        Self::update_last_message_with(&mut conn, chat_id, text, sent_at).await
    }

    /// Same as [`ChatRepository::update_last_message`] on a caller-provided
    /// connection, so it can join an open transaction.
    pub(crate) async fn update_last_message_with(
        conn: &mut SqliteConnection,
        chat_id: &IdType,
        text: &str,
        sent_at: &DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET last_message = ?, last_message_time = ?
            WHERE chat_id = ?
              AND (last_message_time IS NULL OR last_message_time <= ?)
            "#,
        )
        .bind(text)
        .bind(sent_at)
        .bind(chat_id)
        .bind(sent_at)
        .execute(&mut *conn)
        .await?;

        let moved = result.rows_affected() == 1;
        if !moved {
            debug!("Cached last message is newer, keeping it");
        }
        Ok(moved)
    }
}

impl Create<Chat, CreateChatDTO> for ChatRepository {
    #[instrument(skip(self, data), fields(user1 = %data.user1_id, user2 = %data.user2_id))]
    async fn create(&self, data: &CreateChatDTO) -> Result<Chat, Error> {
        debug!("Creating new chat");
        // the unique index on the unordered pair rejects a second chat for the same users
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            INSERT INTO chats (user1_id, user2_id, created_at)
            VALUES (?, ?, ?)
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(data.user1_id)
        .bind(data.user2_id)
        .bind(data.created_at)
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Chat created with id {}", chat.chat_id);
        Ok(chat)
    }
}

impl Read<Chat, IdType> for ChatRepository {
    #[instrument(skip(self), fields(chat_id = %id))]
    async fn read(&self, id: &IdType) -> Result<Option<Chat>, Error> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        if chat.is_none() {
            debug!("Chat not found");
        }
        Ok(chat)
    }
}
