//! Application-level handlers for the chat namespace.
//!
//! The hub stays policy-free; room naming lives here: an authenticated socket
//! joins its session room (`claims.session_id`) and its user room
//! (`claims.user_id` as decimal string), which the admin broadcast endpoint
//! targets.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::TokenDecoder;
use crate::hub::SocketServer;

pub const CHAT_NAMESPACE: &str = "/chat";

#[derive(Debug, Deserialize)]
struct AuthenticateRequest {
    token: String,
}

/// Register the chat namespace setup: every new socket learns its assigned
/// connection id on `connected` and may join its session/user rooms through
/// `authenticate`.
pub fn register_chat(server: &SocketServer, decoder: Arc<TokenDecoder>) {
    server.register(CHAT_NAMESPACE, move |socket| {
        socket.on("connected", |socket, _payload| async move {
            let _ = socket
                .emit("send_connect_id", json!(socket.id().to_string()))
                .await;
        });

        let decoder = decoder.clone();
        socket.on("authenticate", move |socket, payload| {
            let decoder = decoder.clone();
            async move {
                let request: AuthenticateRequest = match serde_json::from_value(payload) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %socket.id(),
                            error = %e,
                            "Malformed authenticate payload"
                        );
                        let _ = socket.emit("authenticate_fail", Value::Null).await;
                        return;
                    }
                };

                let claims = match decoder.validate(&request.token) {
                    Ok(claims) => claims,
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %socket.id(),
                            error = %e,
                            "Authentication failed"
                        );
                        let _ = socket.emit("authenticate_fail", Value::Null).await;
                        return;
                    }
                };

                socket.join(claims.session_room());
                socket.join(&claims.user_room());

                tracing::info!(
                    connection_id = %socket.id(),
                    user_id = claims.user_id,
                    session_id = %claims.session_id,
                    "Socket authenticated"
                );
                let _ = socket
                    .emit(
                        "authenticate_success",
                        json!({
                            "id": claims.user_id,
                            "session_id": claims.session_id,
                        }),
                    )
                    .await;
            }
        });
    });
}
