//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod auth;
pub mod chat;
pub mod message;
pub mod user;

// Re-exports per facilitare l'import
pub use auth::{login_user, register_user};
pub use chat::{get_chat, get_chat_messages, list_chats, start_chat};
pub use message::{mark_message_read, send_message};
pub use user::{get_my_profile, get_user_by_id, search_users, update_password, update_profile};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!(
            "Server is running! {} users online",
            state.presence.online_count()
        ),
    )
}
