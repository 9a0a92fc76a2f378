//! WebSocket Event DTOs - Eventi scambiati sul WebSocket
//!
//! Serde serializza gli eventi come tagged union:
//! `{ "type": "new-message", "data": { ... } }`

use crate::dtos::MessageDTO;
use crate::entities::IdType;
use serde::{Deserialize, Serialize};

/// Events a client may send over its connection. The sender of every event
/// is the authenticated user owning the connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    UserOnline,
    UserOffline,
    SendMessage { chat_id: IdType, text: String },
    MarkRead { message_id: IdType, chat_id: IdType },
}

/// Events pushed by the server to a connection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    PresenceChanged { user_id: IdType, is_online: bool },
    NewMessage { chat_id: IdType, message: MessageDTO },
    MessageSent { chat_id: IdType, message: MessageDTO },
    MessageRead { message_id: IdType, chat_id: IdType },
    MessageError { reason: String },
}
