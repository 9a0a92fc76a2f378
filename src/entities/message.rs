//! Message entity - Entità messaggio

use super::IdType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub message_id: IdType,
    pub chat_id: IdType,
    pub sender_id: IdType,
    pub text: String,
    pub created_at: DateTime<Utc>,
    // flipped once, and only by the participant that did not send it
    #[sqlx(rename = "is_read")]
    pub read: bool,
}
