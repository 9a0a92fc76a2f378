//! Enumerazioni - Privacy settings stored alongside each user

use serde::{Deserialize, Serialize};

/// Who can find the user through search
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Discoverability {
    #[default]
    Everyone,
    Contacts,
    Nobody,
}

/// Who can open a new chat with the user
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessagePrivacy {
    #[default]
    Everyone,
    Contacts,
}
