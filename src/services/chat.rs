//! Chat services - Gestione operazioni sulle chat

use crate::core::{AppError, AppState};
use crate::delivery;
use crate::dtos::{ChatDTO, MessageDTO, MessagesQuery, UserDTO};
use crate::entities::{Chat, IdType, User};
use crate::repositories::Read;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ChatDTO>>, AppError> {
    debug!("Listing chats for user");
    let chats = state.chat.find_many_by_user_id(&current_user.user_id).await?;

    // the other participant of every chat, looked up concurrently
    let chats_dto: Vec<ChatDTO> = try_join_all(chats.into_iter().map(|chat| {
        let state = state.clone();
        let user_id = current_user.user_id;
        async move { format_chat(&state, chat, user_id).await }
    }))
    .await?
    .into_iter()
    .flatten()
    .collect();

    info!("Successfully retrieved {} chats", chats_dto.len());
    Ok(Json(chats_dto))
}

/// Find-or-create the chat with `user_id`
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, target = %user_id))]
pub async fn start_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<IdType>,
) -> Result<Json<ChatDTO>, AppError> {
    let chat = delivery::open_chat(&state, current_user.user_id, user_id).await?;

    let formatted = format_chat(&state, chat, current_user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(formatted))
}

/// The chat was already loaded and checked by `chat_participant_middleware`
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(chat): Extension<Chat>,
) -> Result<Json<ChatDTO>, AppError> {
    let formatted = format_chat(&state, chat, current_user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(formatted))
}

/// History of a chat, oldest first. Fetching marks the other participant's
/// messages as read.
#[instrument(skip(state, current_user, chat, params), fields(user_id = %current_user.user_id, chat_id = %chat.chat_id))]
pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(chat): Extension<Chat>,
    Query(params): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    let limit = params.effective_limit();
    let messages =
        delivery::fetch_history(&state, &current_user, &chat, params.before.as_ref(), limit)
            .await?;

    let other = match chat.other_participant(current_user.user_id) {
        Some(other_id) => state.user.read(&other_id).await?,
        None => None,
    };

    let messages_dto: Vec<MessageDTO> = messages
        .into_iter()
        .map(|message| {
            let sender = if message.sender_id == current_user.user_id {
                Some(&current_user)
            } else {
                other.as_ref()
            };
            MessageDTO::for_viewer(message, current_user.user_id, sender)
        })
        .collect();

    debug!("Returning {} messages", messages_dto.len());
    Ok(Json(messages_dto))
}

/// Formats a chat from the point of view of `viewer_id`. `None` when the
/// other participant no longer exists.
async fn format_chat(
    state: &AppState,
    chat: Chat,
    viewer_id: IdType,
) -> Result<Option<ChatDTO>, AppError> {
    let Some(other_id) = chat.other_participant(viewer_id) else {
        return Ok(None);
    };
    let Some(other) = state.user.read(&other_id).await? else {
        return Ok(None);
    };
    let is_online = state.presence.is_user_online(&other_id);
    Ok(Some(ChatDTO::new(chat, UserDTO::new(other, is_online))))
}
