//! DTOs module - Data Transfer Objects
//!
//! I DTOs separano la rappresentazione esterna (API e WebSocket) dalla
//! rappresentazione interna (entities).

pub mod chat;
pub mod message;
pub mod query;
pub mod user;
pub mod ws_event;

// Re-exports per facilitare l'import
pub use chat::{ChatDTO, CreateChatDTO};
pub use message::{CreateMessageDTO, MAX_MESSAGE_LENGTH, MessageDTO, SendMessageDTO};
pub use query::{MessagesQuery, UserSearchQuery};
pub use user::{
    CreateUserDTO, LoginDTO, LoginResponseDTO, ProfileDTO, UpdatePasswordDTO, UpdateProfileDTO,
    UpdateSettingsDTO, UserDTO,
};
pub use ws_event::{ClientEvent, ServerEvent};
