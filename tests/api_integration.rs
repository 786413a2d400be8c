//! Admin API behavior: validation as well as delivery through the hub.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use chat_socket_hub::config::{JwtConfig, ServerConfig, Settings};
use chat_socket_hub::events::CHAT_NAMESPACE;
use chat_socket_hub::hub::{InProcessTransport, Socket, TransportPeer};
use chat_socket_hub::server::{create_app, AppState};

fn test_state() -> AppState {
    AppState::new(Settings {
        server: ServerConfig::default(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            issuer: None,
            audience: None,
        },
    })
}

fn attach(state: &AppState) -> (Arc<Socket>, TransportPeer) {
    let (transport, peer) = InProcessTransport::pair();
    let socket = state.socket_server.attach(CHAT_NAMESPACE, Arc::new(transport));
    (socket, peer)
}

async fn post_broadcast(state: &AppState, body: Value) -> (StatusCode, Value) {
    let app = create_app(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/broadcast")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn broadcast_excludes_originating_session() {
    // Socket A: user 7, session sess-A (the sender). Socket C: user 9.
    let state = test_state();
    let (a, peer_a) = attach(&state);
    let (c, peer_c) = attach(&state);
    a.join("7");
    a.join("sess-A");
    c.join("9");

    let (status, body) = post_broadcast(
        &state,
        json!({
            "user_ids": [7, 9],
            "session_id": "sess-A",
            "event": "message",
            "payload": {"text": "hi"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Ok": true}));

    // C receives the event.
    let text = peer_c.recv().await.unwrap();
    let frame: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(frame, json!({"event": "message", "payload": {"text": "hi"}}));

    // A does not, despite being in a targeted room: its next frame is a probe
    // sent directly to it afterwards.
    state
        .socket_server
        .broadcast()
        .of(CHAT_NAMESPACE)
        .to(a.id())
        .emit("probe", Value::Null)
        .await;
    let text = peer_a.recv().await.unwrap();
    let frame: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(frame["event"], "probe");
}

#[tokio::test]
async fn missing_fields_answer_400_before_any_delivery() {
    let state = test_state();
    let (a, peer_a) = attach(&state);
    a.join("7");

    let (status, body) = post_broadcast(
        &state,
        json!({
            "user_ids": [7],
            "event": "message",
            "payload": {}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("Error").is_some());

    // Nothing was delivered: a probe is the first thing A sees.
    state
        .socket_server
        .broadcast()
        .of(CHAT_NAMESPACE)
        .to(a.id())
        .emit("probe", Value::Null)
        .await;
    let text = peer_a.recv().await.unwrap();
    assert!(text.contains("probe"));
}

#[tokio::test]
async fn empty_event_is_rejected() {
    let state = test_state();

    let (status, body) = post_broadcast(
        &state,
        json!({
            "user_ids": [7],
            "session_id": "sess-A",
            "event": "",
            "payload": {}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("Error").is_some());
}

#[tokio::test]
async fn broadcast_to_unknown_rooms_is_ok_and_delivers_nowhere() {
    let state = test_state();

    let (status, body) = post_broadcast(
        &state,
        json!({
            "user_ids": [404],
            "session_id": "sess-Z",
            "event": "message",
            "payload": {"text": "into the void"}
        }),
    )
    .await;

    // Registry misses are empty results, never errors.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Ok": true}));
}

#[tokio::test]
async fn health_and_stats_respond() {
    let state = test_state();
    let (a, _peer) = attach(&state);
    a.join("7");

    let app = create_app(state.clone());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = create_app(state.clone());
    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let stats: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["namespaces"]["/chat"]["sockets"], json!(1));
    assert_eq!(stats["namespaces"]["/chat"]["rooms"]["7"], json!(1));
}
