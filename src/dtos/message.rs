//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::{IdType, Message, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MAX_MESSAGE_LENGTH: u64 = 5000;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageDTO {
    pub message_id: IdType,
    pub chat_id: IdType,
    pub sender_id: IdType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_avatar: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            chat_id: value.chat_id,
            sender_id: value.sender_id,
            sender_name: None,
            sender_avatar: None,
            text: value.text,
            created_at: value.created_at,
            read: value.read,
        }
    }
}

impl MessageDTO {
    /// History view for `viewer_id`: own messages always show as read,
    /// sender details are filled in when known.
    pub fn for_viewer(value: Message, viewer_id: IdType, sender: Option<&User>) -> Self {
        let own = value.sender_id == viewer_id;
        let mut dto = Self::from(value);
        dto.read = dto.read || own;
        if let Some(sender) = sender {
            dto.sender_name = Some(sender.nickname.clone());
            dto.sender_avatar = Some(sender.avatar.clone());
        }
        dto
    }
}

/// DTO per creare un nuovo messaggio (senza message_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateMessageDTO {
    pub chat_id: IdType,
    pub sender_id: IdType,

    #[validate(length(min = 1, max = MAX_MESSAGE_LENGTH, message = "Message text must be between 1 and 5000 characters"))]
    pub text: String,

    pub created_at: DateTime<Utc>,
}

/// Body of the REST send fallback
#[derive(Serialize, Deserialize, Debug)]
pub struct SendMessageDTO {
    pub chat_id: IdType,
    pub text: String,
}
