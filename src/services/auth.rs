//! Auth services - Gestione autenticazione e registrazione utenti

use crate::core::{AppError, AppState, auth::TOKEN_COOKIE, encode_jwt};
use crate::dtos::{CreateUserDTO, LoginDTO, LoginResponseDTO, ProfileDTO, UserDTO};
use crate::entities::User;
use crate::repositories::Create;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>, // JSON body
) -> Result<impl IntoResponse, AppError> {
    debug!("Login attempt");
    let username = body.username.trim().to_lowercase();
    if username.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }

    let user = match state.user.find_by_username(&username).await? {
        Some(user) => user,
        None => {
            warn!("Login for unknown username");
            return Err(AppError::unauthorized("Invalid username or password"));
        }
    };

    if !user.verify_password(&body.password) {
        warn!("Wrong password");
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let token = encode_jwt(user.username.clone(), user.user_id, &state.jwt_secret)?;

    let cookie_value = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE,
        token,
        24 * 60 * 60
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, header_value(&cookie_value)?);
    headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {}", token))?);

    let is_online = state.presence.is_user_online(&user.user_id);
    let settings = user.settings.clone();
    let body = LoginResponseDTO {
        token,
        user: ProfileDTO {
            user: UserDTO::new(user, is_online),
            settings,
        },
    };

    info!("User logged in");
    Ok((StatusCode::OK, headers, Json(body)))
}

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserDTO>, // JSON body
) -> Result<impl IntoResponse, AppError> {
    let body = body.normalized();
    body.validate()?;

    if state.user.find_by_username(&body.username).await?.is_some() {
        warn!("Username already taken");
        return Err(AppError::conflict("Username already exists"));
    }

    let password_hash = User::hash_password(&body.password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;

    let new_user = CreateUserDTO {
        password: password_hash,
        ..body
    };

    let created_user = match state.user.create(&new_user).await {
        Ok(user) => user,
        Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
            return Err(AppError::conflict("Username already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = created_user.user_id, "User registered");
    Ok((StatusCode::CREATED, Json(UserDTO::new(created_user, false))))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|_| AppError::internal_server_error("Invalid header value"))
}
