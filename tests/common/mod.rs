#![allow(dead_code)]

use axum_test::TestServer;
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use welo_server::core::AppState;
use welo_server::dtos::{CreateChatDTO, CreateUserDTO, UpdateProfileDTO, UpdateSettingsDTO};
use welo_server::entities::{Chat, User};
use welo_server::repositories::{Create, Update, init_pool};

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";
pub const PASSWORD: &str = "password123";

/// Crea un AppState per i test su un database SQLite in memoria,
/// con le migrazioni già applicate
pub async fn create_test_state() -> Arc<AppState> {
    create_test_state_with_pool().await.0
}

/// Come `create_test_state`, restituendo anche il pool (es. per chiuderlo)
pub async fn create_test_state_with_pool() -> (Arc<AppState>, SqlitePool) {
    let pool = init_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to create in-memory database");
    let state = Arc::new(AppState::new(pool.clone(), JWT_SECRET.to_string()));
    (state, pool)
}

static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

/// File SQLite temporaneo, rimosso (con WAL e SHM) al drop
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    fn new() -> Self {
        let name = format!(
            "welo-test-{}-{}.db",
            std::process::id(),
            NEXT_DB.fetch_add(1, Ordering::Relaxed)
        );
        TempDatabase {
            path: std::env::temp_dir().join(name),
        }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// AppState su un file SQLite con più connessioni, per i test di concorrenza.
/// Il `TempDatabase` va tenuto in vita per tutta la durata del test.
pub async fn create_file_test_state(max_connections: u32) -> (Arc<AppState>, TempDatabase) {
    let db = TempDatabase::new();
    let pool = init_pool(&db.url(), max_connections)
        .await
        .expect("Failed to create file database");
    let state = Arc::new(AppState::new(pool, JWT_SECRET.to_string()));
    (state, db)
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = welo_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token per testing, valido per 24 ore
pub fn create_test_jwt(user: &User) -> String {
    welo_server::auth::encode_jwt(user.username.clone(), user.user_id, JWT_SECRET)
        .expect("Failed to create JWT token")
}

/// Inserisce un utente con password `PASSWORD`.
/// Cost basso per non rallentare i test, la verifica non dipende dal cost.
pub async fn seed_user(state: &AppState, username: &str) -> User {
    let password = bcrypt::hash(PASSWORD, 4).expect("hash");
    let mut nickname = username.to_string();
    if let Some(first) = nickname.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    state
        .user
        .create(&CreateUserDTO {
            username: username.to_string(),
            nickname,
            password,
            avatar: None,
        })
        .await
        .expect("Failed to seed user")
}

pub async fn seed_chat(state: &AppState, a: &User, b: &User) -> Chat {
    state
        .chat
        .create(&CreateChatDTO {
            user1_id: a.user_id,
            user2_id: b.user_id,
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to seed chat")
}

/// Applica delle impostazioni all'utente direttamente sul repository
pub async fn apply_settings(state: &AppState, user: &User, settings: UpdateSettingsDTO) -> User {
    state
        .user
        .update(
            &user.user_id,
            &UpdateProfileDTO {
                settings: Some(settings),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update settings")
}
