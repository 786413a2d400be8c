use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde_json::Value;
use uuid::Uuid;

use super::frame::Frame;
use super::registry::{NamespaceRegistry, DEFAULT_ROOM};
use super::transport::{Transport, TransportError};

/// Process-unique identifier assigned at upgrade. Registry key; never reused
/// within the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Connecting,
    Open,
    Closed,
}

impl SocketState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

type BoxedHandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Event callback registered via [`Socket::on`]. Runs synchronously on the
/// connection's own read task.
pub type EventHandler = Arc<dyn Fn(Arc<Socket>, Value) -> BoxedHandlerFuture + Send + Sync>;

/// Logical session bound to one transport: identity, handler table and room
/// membership within a single namespace.
pub struct Socket {
    id: ConnectionId,
    namespace: String,
    transport: Arc<dyn Transport>,
    handlers: DashMap<String, EventHandler>,
    rooms: DashSet<String>,
    namespaces: Arc<NamespaceRegistry>,
    state: AtomicU8,
}

impl Socket {
    pub fn new(
        namespace: &str,
        transport: Arc<dyn Transport>,
        namespaces: Arc<NamespaceRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            namespace: namespace.to_string(),
            transport,
            handlers: DashMap::new(),
            rooms: DashSet::new(),
            namespaces,
            state: AtomicU8::new(SocketState::Connecting as u8),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> SocketState {
        SocketState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn mark_open(&self) {
        let _ = self.state.compare_exchange(
            SocketState::Connecting as u8,
            SocketState::Open as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Register the handler for an event name, overwriting any previous one.
    pub fn on<F, Fut>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(Arc<Socket>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: EventHandler =
            Arc::new(move |socket, payload| Box::pin(handler(socket, payload)) as BoxedHandlerFuture);
        self.handlers.insert(event.into(), handler);
    }

    /// Invoke the registered handler for an event. Unknown events are dropped
    /// silently; that is the contract, not a defect.
    pub async fn dispatch(self: &Arc<Self>, event: &str, payload: Value) {
        let handler = self.handlers.get(event).map(|h| h.clone());
        match handler {
            Some(handler) => handler(self.clone(), payload).await,
            None => {
                tracing::trace!(
                    connection_id = %self.id,
                    event = %event,
                    "No handler registered, frame dropped"
                );
            }
        }
    }

    /// Join a named room in this socket's namespace. Idempotent.
    pub fn join(self: &Arc<Self>, room: &str) {
        if room == DEFAULT_ROOM {
            return;
        }
        self.rooms.insert(room.to_string());
        self.namespaces.add(&self.namespace, room, self.clone());
        tracing::debug!(connection_id = %self.id, room = %room, "Joined room");
    }

    /// Leave a named room. A no-op for non-members and for the default room,
    /// which holds the socket for its whole lifetime.
    pub fn leave(&self, room: &str) {
        if room == DEFAULT_ROOM {
            return;
        }
        self.rooms.remove(room);
        self.namespaces
            .get(&self.namespace)
            .remove_socket(room, self.id);
        tracing::debug!(connection_id = %self.id, room = %room, "Left room");
    }

    pub fn in_room(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }

    /// Drop the membership entry without touching the room registry. Used by
    /// room deletion, which already owns the registry side.
    pub(crate) fn forget_room(&self, room: &str) {
        self.rooms.remove(room);
    }

    /// Serialize `{event, payload}` and write it to the transport. Write
    /// failures are reported to the caller; they never drive teardown, only
    /// read-loop errors do.
    pub async fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        let text = serde_json::to_string(&Frame::new(event, payload))?;
        self.transport.write(text).await
    }

    /// Force-close the transport. The read loop observes the closure and runs
    /// standard teardown.
    pub async fn disconnect(&self) {
        self.transport.close().await;
    }

    /// Read the next raw frame from the transport.
    pub(crate) async fn read_frame(&self) -> Result<String, TransportError> {
        self.transport.read().await
    }

    /// Remove this socket from every room and the default room, then close
    /// the transport. Idempotent; terminal.
    pub(crate) async fn teardown(&self) {
        if self.state.swap(SocketState::Closed as u8, Ordering::SeqCst)
            == SocketState::Closed as u8
        {
            return;
        }

        let rooms = self.namespaces.get(&self.namespace);
        let joined: Vec<String> = self.rooms.iter().map(|r| r.clone()).collect();
        for room in &joined {
            rooms.remove_socket(room, self.id);
        }
        self.rooms.clear();
        rooms.remove_socket(DEFAULT_ROOM, self.id);

        self.transport.close().await;

        tracing::info!(
            connection_id = %self.id,
            namespace = %self.namespace,
            rooms = joined.len(),
            "Socket closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::transport::InProcessTransport;
    use serde_json::json;

    fn open_socket() -> (Arc<Socket>, crate::hub::transport::TransportPeer) {
        let namespaces = Arc::new(NamespaceRegistry::new());
        let (transport, peer) = InProcessTransport::pair();
        let socket = Socket::new("/chat", Arc::new(transport), namespaces.clone());
        namespaces.add("/chat", DEFAULT_ROOM, socket.clone());
        socket.mark_open();
        (socket, peer)
    }

    #[tokio::test]
    async fn emit_writes_envelope() {
        let (socket, peer) = open_socket();

        socket.emit("ping", json!({"n": 1})).await.unwrap();

        let text = peer.recv().await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"event": "ping", "payload": {"n": 1}}));
    }

    #[tokio::test]
    async fn repeated_join_keeps_single_membership() {
        let (socket, _peer) = open_socket();

        socket.join("user:7");
        socket.join("user:7");

        let members = socket.namespaces.get("/chat").get("user:7");
        assert_eq!(members.len(), 1);
        assert!(socket.in_room("user:7"));
    }

    #[tokio::test]
    async fn leave_on_non_member_is_noop() {
        let (socket, _peer) = open_socket();
        socket.leave("never-joined");
        assert!(!socket.in_room("never-joined"));
    }

    #[tokio::test]
    async fn on_overwrites_previous_handler() {
        let (socket, peer) = open_socket();

        socket.on("hello", |socket, _| async move {
            let _ = socket.emit("reply", json!("first")).await;
        });
        socket.on("hello", |socket, _| async move {
            let _ = socket.emit("reply", json!("second")).await;
        });

        socket.dispatch("hello", Value::Null).await;

        let text = peer.recv().await.unwrap();
        let frame: Frame = serde_json::from_str(&text).unwrap();
        assert_eq!(frame.payload, json!("second"));
    }

    #[tokio::test]
    async fn teardown_clears_all_memberships() {
        let (socket, _peer) = open_socket();
        socket.join("user:7");
        socket.join("sess-A");

        socket.teardown().await;

        let rooms = socket.namespaces.get("/chat");
        assert!(rooms.get("user:7").is_empty());
        assert!(rooms.get("sess-A").is_empty());
        assert!(rooms.get(DEFAULT_ROOM).is_empty());
        assert_eq!(socket.state(), SocketState::Closed);
    }
}
