//! End-to-end tests del gateway WebSocket su un server reale

mod common;

#[cfg(test)]
mod websocket_tests {
    use super::common::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::HeaderValue;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use welo_server::AppState;
    use welo_server::entities::User;
    use std::sync::Arc;

    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn spawn_server(state: Arc<AppState>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = welo_server::create_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{}/ws", addr)
    }

    async fn open_socket(url: &str, user: &User) -> Socket {
        let mut request = url.into_client_request().unwrap();
        request.headers_mut().insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", create_test_jwt(user))).unwrap(),
        );
        let (socket, _) = connect_async(request).await.expect("WebSocket handshake");
        socket
    }

    /// L'upgrade termina prima che la connessione sia registrata
    async fn wait_online(state: &AppState, user: &User) {
        timeout(Duration::from_secs(5), async {
            while !state.presence.is_user_online(&user.user_id) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("user never came online");
    }

    /// Legge fino al prossimo evento del tipo richiesto
    async fn next_event(socket: &mut Socket, event_type: &str) -> Value {
        timeout(Duration::from_secs(5), async {
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let event: Value = serde_json::from_str(&text).unwrap();
                        if event["type"] == event_type {
                            return event;
                        }
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended while waiting for {}: {:?}", event_type, other),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", event_type))
    }

    async fn send_event(socket: &mut Socket, event: Value) {
        socket
            .send(Message::Text(event.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upgrade_requires_authentication() {
        let state = create_test_state().await;
        let url = spawn_server(state).await;

        assert!(connect_async(url.as_str()).await.is_err());
    }

    #[tokio::test]
    async fn test_message_round_trip_between_two_clients() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let url = spawn_server(state.clone()).await;

        let mut alice_ws = open_socket(&url, &alice).await;
        wait_online(&state, &alice).await;
        let mut bob_ws = open_socket(&url, &bob).await;
        wait_online(&state, &bob).await;

        let presence = next_event(&mut alice_ws, "presence-changed").await;
        assert_eq!(presence["data"]["user_id"], bob.user_id);
        assert_eq!(presence["data"]["is_online"], true);

        send_event(
            &mut alice_ws,
            json!({ "type": "send-message", "data": { "chat_id": chat.chat_id, "text": "ciao bob" } }),
        )
        .await;

        let sent = next_event(&mut alice_ws, "message-sent").await;
        let received = next_event(&mut bob_ws, "new-message").await;
        assert_eq!(received["data"]["message"]["text"], "ciao bob");
        assert_eq!(received["data"]["message"]["read"], false);
        assert_eq!(
            sent["data"]["message"]["message_id"],
            received["data"]["message"]["message_id"]
        );

        let message_id = received["data"]["message"]["message_id"].clone();
        send_event(
            &mut bob_ws,
            json!({
                "type": "mark-read",
                "data": { "message_id": message_id, "chat_id": chat.chat_id }
            }),
        )
        .await;

        let read = next_event(&mut alice_ws, "message-read").await;
        assert_eq!(read["data"]["message_id"], sent["data"]["message"]["message_id"]);

        bob_ws.close(None).await.unwrap();
        let offline = next_event(&mut alice_ws, "presence-changed").await;
        assert_eq!(offline["data"]["user_id"], bob.user_id);
        assert_eq!(offline["data"]["is_online"], false);
    }

    #[tokio::test]
    async fn test_malformed_and_rejected_events_keep_connection_open() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let url = spawn_server(state.clone()).await;

        let mut alice_ws = open_socket(&url, &alice).await;
        wait_online(&state, &alice).await;

        alice_ws
            .send(Message::Text("{ this is not valid json at all }".to_string()))
            .await
            .unwrap();
        let error = next_event(&mut alice_ws, "message-error").await;
        assert_eq!(error["data"]["reason"], "Malformed event");

        send_event(
            &mut alice_ws,
            json!({ "type": "send-message", "data": { "chat_id": 9999, "text": "dove sono?" } }),
        )
        .await;
        let error = next_event(&mut alice_ws, "message-error").await;
        assert_eq!(error["data"]["reason"], "Chat not found");

        send_event(
            &mut alice_ws,
            json!({ "type": "send-message", "data": { "chat_id": chat.chat_id, "text": "ancora qui" } }),
        )
        .await;
        next_event(&mut alice_ws, "message-sent").await;
        assert!(state.presence.is_user_online(&alice.user_id));
    }

    #[tokio::test]
    async fn test_second_connection_closes_the_first() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let url = spawn_server(state.clone()).await;

        let mut first = open_socket(&url, &alice).await;
        wait_online(&state, &alice).await;
        let _second = open_socket(&url, &alice).await;

        let closed = timeout(Duration::from_secs(5), async {
            loop {
                match first.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "La prima connessione deve essere chiusa");
        assert!(state.presence.is_user_online(&alice.user_id));
    }
}
