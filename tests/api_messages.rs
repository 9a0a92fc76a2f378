//! Integration tests per gli endpoints dei messaggi e della cronologia

mod common;

#[cfg(test)]
mod message_tests {
    use super::common::*;
    use axum_test::TestServer;
    use axum_test::http::StatusCode;
    use serde_json::{Value, json};
    use welo_server::dtos::MAX_MESSAGE_LENGTH;
    use welo_server::entities::{Chat, User};
    use welo_server::repositories::Read;

    async fn send(server: &TestServer, from: &User, chat: &Chat, text: &str) -> Value {
        let response = server
            .post("/messages")
            .authorization_bearer(create_test_jwt(from))
            .json(&json!({ "chat_id": chat.chat_id, "text": text }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    // ============================================================
    // Test per POST /messages - send_message
    // ============================================================

    #[tokio::test]
    async fn test_send_message_rejections() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let eve = seed_user(&state, "eve").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let server = create_test_server(state);
        let too_long = MAX_MESSAGE_LENGTH as usize + 1;

        server
            .post("/messages")
            .authorization_bearer(create_test_jwt(&alice))
            .json(&json!({ "chat_id": chat.chat_id, "text": "   " }))
            .await
            .assert_status_bad_request();

        server
            .post("/messages")
            .authorization_bearer(create_test_jwt(&alice))
            .json(&json!({ "chat_id": chat.chat_id, "text": "x".repeat(too_long) }))
            .await
            .assert_status_bad_request();

        server
            .post("/messages")
            .authorization_bearer(create_test_jwt(&eve))
            .json(&json!({ "chat_id": chat.chat_id, "text": "intrusa" }))
            .await
            .assert_status_forbidden();

        server
            .post("/messages")
            .authorization_bearer(create_test_jwt(&alice))
            .json(&json!({ "chat_id": 9999, "text": "hello?" }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_chat_cache_follows_sequential_sends() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let server = create_test_server(state.clone());

        let mut last = Value::Null;
        for i in 0..5 {
            let from = if i % 2 == 0 { &alice } else { &bob };
            last = send(&server, from, &chat, &format!("messaggio {}", i)).await;
        }

        let cached = state.chat.find_by_participants(&alice.user_id, &bob.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.last_message.as_deref(), Some("messaggio 4"));
        assert_eq!(
            cached.last_message_time.map(|t| serde_json::to_value(t).unwrap()),
            Some(last["created_at"].clone())
        );
    }

    // ============================================================
    // Test per GET /chats/{chat_id}/messages - get_chat_messages
    // ============================================================

    #[tokio::test]
    async fn test_history_marks_incoming_messages_read() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let server = create_test_server(state.clone());

        let sent = send(&server, &alice, &chat, "ci sei?").await;
        assert_eq!(sent["read"], true, "Il mittente vede sempre i propri messaggi come letti");

        // lato alice: il messaggio è suo, nessun cambio di stato
        let alice_view: Vec<Value> = server
            .get(&format!("/chats/{}/messages", chat.chat_id))
            .authorization_bearer(create_test_jwt(&alice))
            .await
            .json();
        assert_eq!(alice_view[0]["read"], true);
        let message_id = sent["message_id"].as_i64().unwrap();
        assert!(!state.msg.read(&message_id).await.unwrap().unwrap().read);

        // lato bob: la lettura della cronologia lo segna come letto
        let bob_view: Vec<Value> = server
            .get(&format!("/chats/{}/messages", chat.chat_id))
            .authorization_bearer(create_test_jwt(&bob))
            .await
            .json();
        assert_eq!(bob_view[0]["read"], true);
        assert_eq!(bob_view[0]["sender_name"], "Alice");
        assert!(state.msg.read(&message_id).await.unwrap().unwrap().read);
    }

    #[tokio::test]
    async fn test_history_is_chronological_and_paginated() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let server = create_test_server(state);

        for i in 0..5 {
            send(&server, &alice, &chat, &format!("m{}", i)).await;
        }
        let token = create_test_jwt(&alice);

        let latest: Vec<Value> = server
            .get(&format!("/chats/{}/messages", chat.chat_id))
            .add_query_param("limit", 2)
            .authorization_bearer(&token)
            .await
            .json();
        let texts: Vec<&str> = latest.iter().filter_map(|m| m["text"].as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);

        let older: Vec<Value> = server
            .get(&format!("/chats/{}/messages", chat.chat_id))
            .add_query_param("limit", 2)
            .add_query_param("before", latest[0]["created_at"].as_str().unwrap())
            .authorization_bearer(&token)
            .await
            .json();
        let texts: Vec<&str> = older.iter().filter_map(|m| m["text"].as_str()).collect();
        assert_eq!(texts, vec!["m1", "m2"]);

        let clamped: Vec<Value> = server
            .get(&format!("/chats/{}/messages", chat.chat_id))
            .add_query_param("limit", 0)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(clamped.len(), 1);
    }

    // ============================================================
    // Test per PUT /messages/{message_id}/read - mark_message_read
    // ============================================================

    #[tokio::test]
    async fn test_mark_read_is_monotonic() {
        let state = create_test_state().await;
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let eve = seed_user(&state, "eve").await;
        let chat = seed_chat(&state, &alice, &bob).await;
        let server = create_test_server(state);

        let sent = send(&server, &alice, &chat, "leggimi").await;
        let url = format!("/messages/{}/read", sent["message_id"]);

        let own: Value = server.put(&url).authorization_bearer(create_test_jwt(&alice)).await.json();
        assert_eq!(own["read"], false, "Il mittente non può segnare come letto");

        server
            .put(&url)
            .authorization_bearer(create_test_jwt(&eve))
            .await
            .assert_status_forbidden();

        let first: Value = server.put(&url).authorization_bearer(create_test_jwt(&bob)).await.json();
        assert_eq!(first["read"], true);
        let second: Value = server.put(&url).authorization_bearer(create_test_jwt(&bob)).await.json();
        assert_eq!(second["read"], false);

        server
            .put("/messages/9999/read")
            .authorization_bearer(create_test_jwt(&bob))
            .await
            .assert_status_not_found();
    }
}
