//! User DTOs - Data Transfer Objects per utenti

use crate::entities::{Discoverability, IdType, MessagePrivacy, User, UserSettings};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9_.]+$").unwrap();
}

/// Public view of a user, password and settings are never exposed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserDTO {
    pub user_id: IdType,
    pub username: String,
    pub nickname: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
    pub is_online: bool,
}

impl UserDTO {
    /// `connected` comes from the presence table; users that hide their
    /// status always show up as offline.
    pub fn new(value: User, connected: bool) -> Self {
        let is_online = connected && value.settings.online_status;
        Self {
            user_id: value.user_id,
            username: value.username,
            nickname: value.nickname,
            avatar: value.avatar,
            registered_at: value.registered_at,
            is_online,
        }
    }
}

/// The caller's own profile, settings included
#[derive(Serialize, Deserialize, Debug)]
pub struct ProfileDTO {
    #[serde(flatten)]
    pub user: UserDTO,
    pub settings: UserSettings,
}

/// DTO per creare un nuovo utente (senza user_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateUserDTO {
    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        regex(path = *USERNAME_REGEX, message = "Username may only contain a-z, 0-9, '_' and '.'")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 50, message = "Nickname must be between 1 and 50 characters"))]
    pub nickname: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,

    pub avatar: Option<String>,
}

impl CreateUserDTO {
    /// Usernames are stored trimmed and lowercase
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_lowercase();
        self.nickname = self.nickname.trim().to_string();
        self
    }
}

/// DTO per il login (solo username e password)
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginDTO {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponseDTO {
    pub token: String,
    pub user: ProfileDTO,
}

/// DTO per aggiornare il profilo (solo campi modificabili)
#[derive(Serialize, Deserialize, Debug, Default, Validate)]
pub struct UpdateProfileDTO {
    #[validate(length(min = 1, max = 50, message = "Nickname must be between 1 and 50 characters"))]
    pub nickname: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Avatar must be between 1 and 200 characters"))]
    pub avatar: Option<String>,

    #[validate(nested)]
    pub settings: Option<UpdateSettingsDTO>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Validate)]
pub struct UpdateSettingsDTO {
    #[validate(length(min = 1, max = 20))]
    pub theme: Option<String>,
    #[validate(range(min = 10, max = 32, message = "Text size must be between 10 and 32"))]
    pub text_size: Option<i64>,
    pub compact_mode: Option<bool>,
    pub discoverability: Option<Discoverability>,
    pub message_privacy: Option<MessagePrivacy>,
    pub read_receipts: Option<bool>,
    pub online_status: Option<bool>,
}

impl UpdateSettingsDTO {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.text_size.is_none()
            && self.compact_mode.is_none()
            && self.discoverability.is_none()
            && self.message_privacy.is_none()
            && self.read_receipts.is_none()
            && self.online_status.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Validate)]
pub struct UpdatePasswordDTO {
    pub current_password: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub new_password: String,
}
