//! Server library - espone i moduli principali per i test

pub mod core;
pub mod delivery;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, ServiceError, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::core::authentication_middleware;
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/auth", configure_auth_routes())
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/chats", configure_chat_routes(state.clone()))
        .nest("/messages", configure_message_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Configura le routes di autenticazione (login, register)
fn configure_auth_routes() -> Router<Arc<AppState>> {
    use services::*;
    Router::new()
        .route("/login", post(login_user))
        .route("/register", post(register_user))
}

/// Configura le routes per la gestione degli utenti
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/search", get(search_users))
        .route("/profile", get(get_my_profile).put(update_profile))
        .route("/password", put(update_password))
        .route("/{user_id}", get(get_user_by_id))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per le chat
/// Le route con {chat_id} passano anche dal controllo di partecipazione
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{authentication_middleware, chat_participant_middleware};
    use services::*;

    let participant_routes = Router::new()
        .route("/{chat_id}", get(get_chat))
        .route("/{chat_id}/messages", get(get_chat_messages))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            chat_participant_middleware,
        ));

    Router::new()
        .route("/", get(list_chats))
        .route("/start/{user_id}", post(start_chat))
        .merge(participant_routes)
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per i messaggi (fallback REST del WebSocket)
fn configure_message_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", post(send_message))
        .route("/{message_id}/read", put(mark_message_read))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
