//! Application State - Stato condiviso dell'applicazione
//!
//! Contiene tutti i repository, la configurazione di autenticazione e la tabella
//! di presenza degli utenti connessi via WebSocket.

use crate::repositories::{ChatRepository, MessageRepository, UserRepository};
use crate::ws::presence::PresenceTable;
use sqlx::SqlitePool;

/// Stato condiviso tra tutte le route, i middleware e le connessioni WebSocket
pub struct AppState {
    /// Repository per la gestione degli utenti
    pub user: UserRepository,

    /// Repository per la gestione delle chat
    pub chat: ChatRepository,

    /// Repository per la gestione dei messaggi
    pub msg: MessageRepository,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Utenti online con la loro connessione WebSocket attiva.
    /// Owned by this state instance, one table per server process.
    pub presence: PresenceTable,
}

impl AppState {
    /// Crea una nuova istanza di AppState inizializzando tutti i repository
    /// con il pool di connessioni fornito e la JWT secret.
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            msg: MessageRepository::new(pool),
            jwt_secret,
            presence: PresenceTable::new(),
        }
    }
}
