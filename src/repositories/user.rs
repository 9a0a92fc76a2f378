//! UserRepository - Repository per la gestione degli utenti

use super::{Create, Read, Update};
use crate::dtos::{CreateUserDTO, UpdateProfileDTO};
use crate::entities::{IdType, User};
use chrono::Utc;
use sqlx::{Error, SqlitePool};
use tracing::{debug, info, instrument};

const USER_COLUMNS: &str = r#"
    user_id, username, nickname, password, avatar, registered_at,
    theme, text_size, compact_mode, discoverability, message_privacy,
    read_receipts, online_status
"#;

// USER REPO
pub struct UserRepository {
    connection_pool: SqlitePool,
}

impl UserRepository {
    pub fn new(connection_pool: SqlitePool) -> UserRepository {
        Self { connection_pool }
    }

    /// Find user by exact username match (usernames are stored lowercase)
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }

    /// Case-insensitive substring search on username or nickname, limited to
    /// the users `viewer_id` is allowed to find: `everyone`, or `contacts`
    /// when a chat with the viewer exists. The viewer is never part of the
    /// result and `limit` applies to the visible rows.
    #[instrument(skip(self))]
    pub async fn search_visible(
        &self,
        query: &str,
        viewer_id: &IdType,
        limit: i64,
    ) -> Result<Vec<User>, Error> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE user_id <> ?
              AND (username LIKE ? ESCAPE '\' OR nickname LIKE ? ESCAPE '\')
              AND (
                discoverability = 'everyone'
                OR (discoverability = 'contacts' AND EXISTS (
                    SELECT 1 FROM chats
                    WHERE (chats.user1_id = users.user_id AND chats.user2_id = ?)
                       OR (chats.user1_id = ? AND chats.user2_id = users.user_id)
                ))
              )
            ORDER BY username ASC
            LIMIT ?
            "#
        ))
        .bind(viewer_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await?;

        debug!("Search matched {} visible users", users.len());
        Ok(users)
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_password(&self, id: &IdType, password_hash: &str) -> Result<(), Error> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE user_id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("Password updated");
        Ok(())
    }
}

impl Create<User, CreateUserDTO> for UserRepository {
    #[instrument(skip(self, data), fields(username = %data.username))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        debug!("Creating new user");
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, nickname, password, avatar, registered_at)
            VALUES (?, ?, ?, COALESCE(?, 'user'), ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&data.username)
        .bind(&data.nickname)
        .bind(&data.password)
        .bind(&data.avatar)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await?;

        info!("User created with id {}", user.user_id);
        Ok(user)
    }
}

impl Read<User, IdType> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &IdType) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }
}

impl Update<User, UpdateProfileDTO, IdType> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &IdType, data: &UpdateProfileDTO) -> Result<User, Error> {
        debug!("Updating user profile");
        let current_user = self.read(id).await?.ok_or(Error::RowNotFound)?;

        let settings = data.settings.as_ref();
        let nothing_to_update = data.nickname.is_none()
            && data.avatar.is_none()
            && settings.is_none_or(|s| s.is_empty());
        if nothing_to_update {
            debug!("No fields to update, returning current user");
            return Ok(current_user);
        }

        // Build dynamic UPDATE query using QueryBuilder (idiomatic SQLx way)
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE users SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref nickname) = data.nickname {
            separated.push("nickname = ");
            separated.push_bind_unseparated(nickname);
        }
        if let Some(ref avatar) = data.avatar {
            separated.push("avatar = ");
            separated.push_bind_unseparated(avatar);
        }
        if let Some(settings) = settings {
            if let Some(ref theme) = settings.theme {
                separated.push("theme = ");
                separated.push_bind_unseparated(theme);
            }
            if let Some(text_size) = settings.text_size {
                separated.push("text_size = ");
                separated.push_bind_unseparated(text_size);
            }
            if let Some(compact_mode) = settings.compact_mode {
                separated.push("compact_mode = ");
                separated.push_bind_unseparated(compact_mode);
            }
            if let Some(discoverability) = settings.discoverability {
                separated.push("discoverability = ");
                separated.push_bind_unseparated(discoverability);
            }
            if let Some(message_privacy) = settings.message_privacy {
                separated.push("message_privacy = ");
                separated.push_bind_unseparated(message_privacy);
            }
            if let Some(read_receipts) = settings.read_receipts {
                separated.push("read_receipts = ");
                separated.push_bind_unseparated(read_receipts);
            }
            if let Some(online_status) = settings.online_status {
                separated.push("online_status = ");
                separated.push_bind_unseparated(online_status);
            }
        }

        query_builder.push(" WHERE user_id = ");
        query_builder.push_bind(id);

        query_builder.build().execute(&self.connection_pool).await?;

        info!("User profile updated successfully");

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
