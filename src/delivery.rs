//! Delivery Engine - Protocollo di consegna dei messaggi
//!
//! Shared by the WebSocket gateway and the REST handlers. Every operation
//! persists first and notifies afterwards: notifications are best-effort and
//! a recipient that is offline or gone never turns a stored write into a
//! failure.

use crate::core::{AppState, ServiceError};
use crate::dtos::{CreateChatDTO, CreateMessageDTO, MessageDTO, ServerEvent};
use crate::entities::{Chat, IdType, Message, MessagePrivacy, User};
use crate::repositories::{Create, Read};
use crate::ws::presence::{ConnectionHandle, ConnectionId};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Registers `handle` as the live connection of `user_id`. The caller is
/// trusted to have authenticated the user.
pub fn connect(state: &AppState, user_id: IdType, handle: ConnectionHandle) {
    state.presence.set_online(user_id, handle);
}

/// Drops the presence entry owned by `connection_id`, if still current.
pub fn disconnect(state: &AppState, connection_id: ConnectionId) -> Option<IdType> {
    state.presence.remove_by_connection(connection_id)
}

/// Returns the chat between `requester` and `target`, creating it if needed.
///
/// Creation is refused when `target` only accepts messages from contacts;
/// an existing chat is always returned.
#[instrument(skip(state), fields(requester, target))]
pub async fn open_chat(
    state: &AppState,
    requester: IdType,
    target: IdType,
) -> Result<Chat, ServiceError> {
    if requester == target {
        return Err(ServiceError::InvalidInput("cannot open a chat with yourself"));
    }

    let other: User = state
        .user
        .read(&target)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    if let Some(chat) = state.chat.find_by_participants(&requester, &target).await? {
        debug!(chat_id = chat.chat_id, "Chat already exists");
        return Ok(chat);
    }

    if other.settings.message_privacy == MessagePrivacy::Contacts {
        warn!("Target only accepts messages from contacts");
        return Err(ServiceError::PrivacyRestricted);
    }

    let data = CreateChatDTO {
        user1_id: requester,
        user2_id: target,
        created_at: Utc::now(),
    };
    match state.chat.create(&data).await {
        Ok(chat) => Ok(chat),
        Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
            // lost a creation race, the other request's chat is the one
            info!("Chat created concurrently, using the existing one");
            state
                .chat
                .find_by_participants(&requester, &target)
                .await?
                .ok_or(ServiceError::NotFound("Chat"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Persists a message from `sender_id` and pushes it to the other
/// participant when online.
///
/// `origin` is the sender's live connection, which receives `message-sent`;
/// the REST path passes `None` and returns the message instead.
#[instrument(skip(state, text, origin), fields(sender_id, chat_id))]
pub async fn send_message(
    state: &AppState,
    sender_id: IdType,
    chat_id: IdType,
    text: String,
    origin: Option<&ConnectionHandle>,
) -> Result<Message, ServiceError> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidInput("message text is empty"));
    }

    let data = CreateMessageDTO {
        chat_id,
        sender_id,
        text,
        created_at: Utc::now(),
    };
    data.validate()
        .map_err(|_| ServiceError::InvalidInput("message text is too long"))?;

    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or(ServiceError::NotFound("Chat"))?;
    let receiver = chat
        .other_participant(sender_id)
        .ok_or(ServiceError::AccessDenied("not a participant of this chat"))?;

    let message = state.msg.create(&data).await?;
    info!(message_id = message.message_id, "Message persisted");

    let delivered = state.presence.notify(
        &receiver,
        ServerEvent::NewMessage {
            chat_id,
            message: MessageDTO::from(message.clone()),
        },
    );
    debug!(delivered, "Live delivery to receiver");

    if let Some(origin) = origin {
        origin.send(ServerEvent::MessageSent {
            chat_id,
            message: MessageDTO::from(message.clone()),
        });
    }

    Ok(message)
}

/// Marks a message as read on behalf of `actor_id`.
///
/// Returns `true` only for the call that flipped the flag; the sender is
/// notified once, and only if the reader shares read receipts. Reading
/// one's own message is a no-op.
#[instrument(skip(state), fields(actor_id, message_id, chat_id))]
pub async fn mark_read(
    state: &AppState,
    actor_id: IdType,
    message_id: IdType,
    chat_id: IdType,
) -> Result<bool, ServiceError> {
    let message = state
        .msg
        .read(&message_id)
        .await?
        .filter(|m| m.chat_id == chat_id)
        .ok_or(ServiceError::NotFound("Message"))?;

    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or(ServiceError::NotFound("Chat"))?;
    if !chat.has_participant(actor_id) {
        return Err(ServiceError::AccessDenied("not a participant of this chat"));
    }

    if message.sender_id == actor_id {
        debug!("Own message, nothing to mark");
        return Ok(false);
    }

    if !state.msg.mark_read(&message_id).await? {
        debug!("Message was already read");
        return Ok(false);
    }

    if shares_read_receipts(state, actor_id).await {
        state.presence.notify(
            &message.sender_id,
            ServerEvent::MessageRead {
                message_id,
                chat_id,
            },
        );
    }
    Ok(true)
}

/// Loads a page of history for `viewer`, oldest first.
///
/// This read has a side effect: every returned message the other participant
/// sent that was still unread is marked read in one batch, and its sender
/// gets a `message-read` for each of them. The returned messages already
/// carry the updated flag.
#[instrument(skip(state, viewer, chat), fields(viewer_id = viewer.user_id, chat_id = chat.chat_id))]
pub async fn fetch_history(
    state: &AppState,
    viewer: &User,
    chat: &Chat,
    before: Option<&DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<Message>, ServiceError> {
    let other = chat
        .other_participant(viewer.user_id)
        .ok_or(ServiceError::AccessDenied("not a participant of this chat"))?;

    let mut messages = state
        .msg
        .find_many_paginated(&chat.chat_id, before, limit)
        .await?;
    messages.reverse();

    let unread: Vec<IdType> = messages
        .iter()
        .filter(|m| m.sender_id == other && !m.read)
        .map(|m| m.message_id)
        .collect();
    let flipped = state.msg.mark_read_many(&unread).await?;

    for message in messages.iter_mut() {
        if flipped.contains(&message.message_id) {
            message.read = true;
        }
    }

    if !flipped.is_empty() {
        info!(count = flipped.len(), "Messages marked read on fetch");
        if viewer.settings.read_receipts {
            for message_id in &flipped {
                state.presence.notify(
                    &other,
                    ServerEvent::MessageRead {
                        message_id: *message_id,
                        chat_id: chat.chat_id,
                    },
                );
            }
        }
    }

    Ok(messages)
}

async fn shares_read_receipts(state: &AppState, user_id: IdType) -> bool {
    match state.user.read(&user_id).await {
        Ok(Some(user)) => user.settings.read_receipts,
        Ok(None) => false,
        Err(e) => {
            warn!("Could not load reader settings, skipping receipt: {e}");
            false
        }
    }
}
