//! User services - Gestione utenti

use crate::core::{AppError, AppState};
use crate::dtos::{ProfileDTO, UpdatePasswordDTO, UpdateProfileDTO, UserDTO, UserSearchQuery};
use crate::entities::{IdType, User};
use crate::repositories::{Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

const SEARCH_LIMIT: i64 = 20;

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.user_id))]
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<UserSearchQuery>, // query params /users/search?query=...
) -> Result<Json<Vec<UserDTO>>, AppError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("Search query required"))?;

    // discoverability is applied by the query, so the cap counts visible users only
    let visible: Vec<UserDTO> = state
        .user
        .search_visible(query, &current_user.user_id, SEARCH_LIMIT)
        .await?
        .into_iter()
        .map(|user| {
            let is_online = state.presence.is_user_online(&user.user_id);
            UserDTO::new(user, is_online)
        })
        .collect();

    info!("Found {} users matching search criteria", visible.len());
    Ok(Json(visible))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<IdType>, // parametro dalla URL /users/{user_id}
) -> Result<Json<UserDTO>, AppError> {
    let user = state.user.read(&user_id).await?.ok_or_else(|| {
        warn!("User not found");
        AppError::not_found("User not found")
    })?;

    let is_online = state.presence.is_user_online(&user.user_id);
    Ok(Json(UserDTO::new(user, is_online)))
}

/// Profile of the authenticated user, settings included
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Json<ProfileDTO> {
    Json(profile_of(&state, current_user))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdateProfileDTO>,
) -> Result<Json<ProfileDTO>, AppError> {
    body.validate()?;

    let updated = state.user.update(&current_user.user_id, &body).await?;
    info!("Profile updated");
    Ok(Json(profile_of(&state, updated)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdatePasswordDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    if !current_user.verify_password(&body.current_password) {
        warn!("Current password does not match");
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let password_hash = User::hash_password(&body.new_password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;
    state
        .user
        .update_password(&current_user.user_id, &password_hash)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn profile_of(state: &AppState, user: User) -> ProfileDTO {
    let is_online = state.presence.is_user_online(&user.user_id);
    let settings = user.settings.clone();
    ProfileDTO {
        user: UserDTO::new(user, is_online),
        settings,
    }
}
