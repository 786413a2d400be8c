use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
};

use crate::events::CHAT_NAMESPACE;
use crate::hub::engine;
use crate::server::AppState;

use super::WsTransport;

/// WebSocket upgrade handler for the chat namespace.
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one upgraded connection: wrap it in a transport, attach it to the
/// hub and run the read loop until the connection goes away.
#[tracing::instrument(name = "ws.connection", skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let transport = Arc::new(WsTransport::new(socket));
    let socket = state.socket_server.attach(CHAT_NAMESPACE, transport);

    tracing::info!(connection_id = %socket.id(), "WebSocket connection established");
    engine::run(socket.clone()).await;
    tracing::info!(connection_id = %socket.id(), "WebSocket connection closed");
}
