use std::sync::Arc;

use super::frame::Frame;
use super::socket::Socket;

/// Deregisters the socket even when a handler panic unwinds the connection
/// task, so no closed connection lingers in the registries.
struct TeardownGuard(Option<Arc<Socket>>);

impl TeardownGuard {
    fn take(&mut self) -> Option<Arc<Socket>> {
        self.0.take()
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(socket) = self.0.take() {
            tokio::spawn(async move { socket.teardown().await });
        }
    }
}

/// Per-connection read loop.
///
/// Synthesizes the `connected` lifecycle event for the socket's own handlers,
/// then reads frames until the transport fails or closes. Malformed frames
/// are dropped and the connection stays open; only read errors drive
/// teardown. Runs on the connection's own task, so a slow handler delays
/// nothing but its own connection.
#[tracing::instrument(
    name = "engine.run",
    skip(socket),
    fields(connection_id = %socket.id(), namespace = %socket.namespace())
)]
pub async fn run(socket: Arc<Socket>) {
    let mut guard = TeardownGuard(Some(socket.clone()));

    socket.dispatch("connected", serde_json::Value::Null).await;

    loop {
        let text = match socket.read_frame().await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(connection_id = %socket.id(), reason = %e, "Read loop ended");
                break;
            }
        };

        match serde_json::from_str::<Frame>(&text) {
            Ok(frame) => socket.dispatch(&frame.event, frame.payload).await,
            Err(e) => {
                tracing::warn!(
                    connection_id = %socket.id(),
                    error = %e,
                    "Malformed frame dropped"
                );
            }
        }
    }

    if let Some(socket) = guard.take() {
        socket.teardown().await;
    }
}
