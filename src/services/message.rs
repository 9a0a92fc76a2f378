//! Message services - Invio e conferma di lettura via REST

use crate::core::{AppError, AppState};
use crate::delivery;
use crate::dtos::{MessageDTO, SendMessageDTO};
use crate::entities::{IdType, User};
use crate::repositories::Read;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_macros::debug_handler;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// REST fallback for sending: the receiver is still notified live
#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, chat_id = %body.chat_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<SendMessageDTO>,
) -> Result<impl IntoResponse, AppError> {
    let message =
        delivery::send_message(&state, current_user.user_id, body.chat_id, body.text, None)
            .await?;

    let dto = MessageDTO::for_viewer(message, current_user.user_id, Some(&current_user));
    Ok((StatusCode::CREATED, Json(dto)))
}

#[debug_handler]
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, message_id = %message_id))]
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<IdType>,
) -> Result<impl IntoResponse, AppError> {
    let message = state
        .msg
        .read(&message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    let flipped =
        delivery::mark_read(&state, current_user.user_id, message_id, message.chat_id).await?;
    if flipped {
        info!("Message marked as read");
    }

    Ok(Json(json!({ "message_id": message_id, "read": flipped })))
}
