//! Chat entity - Conversazione privata tra due utenti

use super::IdType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Chat {
    pub chat_id: IdType,
    // user1 is whoever started the chat, the pair itself is unordered
    pub user1_id: IdType,
    pub user2_id: IdType,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn has_participant(&self, user_id: IdType) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// Returns the participant that is not `user_id`, or `None` when
    /// `user_id` is not part of this chat.
    pub fn other_participant(&self, user_id: IdType) -> Option<IdType> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}
