//! User entity - Entità utente con metodi per gestione password

use super::IdType;
use super::enums::{Discoverability, MessagePrivacy};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: IdType,
    pub username: String,
    pub nickname: String,
    pub password: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub settings: UserSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserSettings {
    pub theme: String,
    pub text_size: i64,
    pub compact_mode: bool,
    pub discoverability: Discoverability,
    pub message_privacy: MessagePrivacy,
    pub read_receipts: bool,
    pub online_status: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            text_size: 16,
            compact_mode: false,
            discoverability: Discoverability::Everyone,
            message_privacy: MessagePrivacy::Everyone,
            read_receipts: true,
            online_status: true,
        }
    }
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.password).unwrap_or(false)
    }

    /// Hash a password using bcrypt with default cost
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        let hash = hash(password, DEFAULT_COST)?;
        Ok(hash)
    }
}
