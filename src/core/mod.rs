//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! - Autenticazione e JWT
//! - Configurazione
//! - Gestione errori
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    Claims, authentication_middleware, chat_participant_middleware, decode_jwt, encode_jwt,
};
pub use config::Config;
pub use error::{AppError, ServiceError};
pub use state::AppState;
