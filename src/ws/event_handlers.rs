//! WebSocket Event Handlers - Handler per eventi WebSocket

use crate::core::AppState;
use crate::delivery;
use crate::dtos::{ClientEvent, ServerEvent};
use crate::entities::IdType;
use crate::ws::presence::ConnectionHandle;
use tracing::{debug, instrument, warn};

/// Dispatches one client event. Rejections go back to the originating
/// connection as `message-error`; the connection itself stays open.
#[instrument(skip(state, handle, event), fields(user_id))]
pub async fn process_event(
    state: &AppState,
    handle: &ConnectionHandle,
    user_id: IdType,
    event: ClientEvent,
) {
    let outcome = match event {
        ClientEvent::UserOnline => {
            delivery::connect(state, user_id, handle.clone());
            Ok(())
        }
        ClientEvent::UserOffline => {
            delivery::disconnect(state, handle.id());
            Ok(())
        }
        ClientEvent::SendMessage { chat_id, text } => {
            delivery::send_message(state, user_id, chat_id, text, Some(handle))
                .await
                .map(|_| ())
        }
        ClientEvent::MarkRead {
            message_id,
            chat_id,
        } => delivery::mark_read(state, user_id, message_id, chat_id)
            .await
            .map(|flipped| {
                debug!(flipped, "Mark read handled");
            }),
    };

    if let Err(e) = outcome {
        warn!("Client event rejected: {}", e);
        handle.send(ServerEvent::MessageError { reason: e.reason() });
    }
}
