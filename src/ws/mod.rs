//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Questo modulo gestisce le connessioni WebSocket per la comunicazione in tempo reale
//! tra client e server. Include:
//! - Gestione upgrade HTTP -> WebSocket
//! - Gestione connessioni (split sender/receiver)
//! - Dispatch degli eventi client verso il delivery engine
//! - Tabella di presenza degli utenti connessi

pub mod connection;
pub mod event_handlers;
pub mod presence;

// Re-exports pubblici
pub use connection::handle_socket;
pub use presence::{ConnectionHandle, ConnectionId, InternalSignal, PresenceTable};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Minimum spacing between two inbound frames of one connection
pub const RATE_LIMITER_MILLIS: u64 = 5;

/// A connection silent for this long is closed
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Estrarre user_id dall'autenticazione JWT
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione JWT
) -> Response {
    let user_id = current_user.user_id;

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
