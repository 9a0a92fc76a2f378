//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::ws::presence::{ConnectionHandle, ConnectionId, InternalSignal};
use crate::ws::{RATE_LIMITER_MILLIS, TIMEOUT_DURATION_SECONDS};
use crate::{
    AppState, delivery,
    dtos::{ClientEvent, ServerEvent},
    entities::IdType,
    ws::event_handlers::process_event,
};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::{Duration, interval, timeout};
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state), fields(user_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: IdType) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale interno: tutto ciò che deve arrivare al client passa da qui
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();
    let handle = state.presence.new_handle(int_tx);

    delivery::connect(&state, user_id, handle.clone());

    tokio::spawn(write_ws(handle.id(), ws_tx, int_rx));
    tokio::spawn(listen_ws(user_id, ws_rx, handle, state));
}

/// Drains the internal channel into the socket, one JSON text frame per event
#[instrument(skip(websocket_tx, internal_rx))]
pub async fn write_ws(
    connection_id: ConnectionId,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
) {
    debug!("Write task started");

    while let Some(signal) = internal_rx.recv().await {
        match signal {
            InternalSignal::Event(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize event: {:?}", e);
                        continue;
                    }
                };
                if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await {
                    warn!("Failed to send event, closing connection: {:?}", e);
                    break;
                }
            }
            InternalSignal::Shutdown => {
                info!("Shutdown signal received");
                let _ = websocket_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    debug!("Write task terminated");
}

/// Reads client events one at a time, so the events of a connection are
/// handled in the order they were sent.
#[instrument(skip(websocket_rx, handle, state), fields(user_id, connection_id = handle.id()))]
pub async fn listen_ws(
    user_id: IdType,
    mut websocket_rx: SplitStream<WebSocket>,
    handle: ConnectionHandle,
    state: Arc<AppState>,
) {
    debug!("Listen task started");

    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));
    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, websocket_rx.next()).await {
            Ok(Some(msg_result)) => {
                rate_limiter.tick().await;

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("WebSocket error: {:?}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => process_event(&state, &handle, user_id, event).await,
                        Err(e) => {
                            warn!("Failed to deserialize client event: {}", e);
                            handle.send(ServerEvent::MessageError {
                                reason: "Malformed event".to_string(),
                            });
                        }
                    },
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(
                    timeout_secs = TIMEOUT_DURATION_SECONDS,
                    "Connection timeout"
                );
                break;
            }
        }
    }

    // Cleanup
    handle.shutdown();
    delivery::disconnect(&state, handle.id());
    info!("Listen task terminated");
}
