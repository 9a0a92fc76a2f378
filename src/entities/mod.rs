//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod chat;
pub mod enums;
pub mod message;
pub mod user;

/// Row identifier shared by users, chats and messages
pub type IdType = i64;

// Re-exports per facilitare l'import
pub use chat::Chat;
pub use enums::{Discoverability, MessagePrivacy};
pub use message::Message;
pub use user::{User, UserSettings};
