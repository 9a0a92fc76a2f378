//! Chat DTOs - Data Transfer Objects per chat

use crate::dtos::UserDTO;
use crate::entities::{Chat, IdType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat as seen by one of its participants
#[derive(Serialize, Deserialize, Debug)]
pub struct ChatDTO {
    pub chat_id: IdType,
    pub other_user: UserDTO,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatDTO {
    pub fn new(chat: Chat, other_user: UserDTO) -> Self {
        Self {
            chat_id: chat.chat_id,
            other_user,
            last_message: chat.last_message,
            last_message_time: chat.last_message_time,
            created_at: chat.created_at,
        }
    }
}

/// DTO per creare una nuova chat (senza chat_id)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateChatDTO {
    pub user1_id: IdType,
    pub user2_id: IdType,
    pub created_at: DateTime<Utc>,
}
