use std::sync::Arc;

use dashmap::DashMap;

use super::socket::{ConnectionId, Socket};

/// Implicit room holding every open socket of a namespace. Never garbage
/// collected while the namespace exists.
pub const DEFAULT_ROOM: &str = "__default__";

/// Namespace a broadcast builder starts from before `of` is called.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Concurrency-safe set of live sockets keyed by connection id.
///
/// No ordering guarantees; `get_all` returns a snapshot that stays safely
/// iterable under concurrent mutation.
#[derive(Default)]
pub struct SocketRegistry {
    sockets: DashMap<ConnectionId, Arc<Socket>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, socket: Arc<Socket>) {
        self.sockets.insert(socket.id(), socket);
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Socket>> {
        self.sockets.get(&id).map(|s| s.clone())
    }

    pub fn remove(&self, socket: &Socket) {
        self.remove_id(socket.id());
    }

    pub fn remove_id(&self, id: ConnectionId) {
        self.sockets.remove(&id);
    }

    pub fn get_all(&self) -> Vec<Arc<Socket>> {
        self.sockets.iter().map(|s| s.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

/// Maps room name to the registry of its member sockets.
///
/// Rooms are created on first join and deleted once their last member leaves;
/// the default room is exempt from that collection.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<SocketRegistry>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the room, then add the socket. Idempotent.
    pub fn add(&self, room: &str, socket: Arc<Socket>) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .add(socket);
    }

    /// The room's sockets, or an empty registry when the room does not exist.
    /// Callers never have to special-case absence.
    pub fn get(&self, room: &str) -> Arc<SocketRegistry> {
        self.rooms
            .get(room)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn get_socket(&self, room: &str, id: ConnectionId) -> Option<Arc<Socket>> {
        self.get(room).get(id)
    }

    /// Drop one socket from a room, collecting the room when it empties.
    pub fn remove_socket(&self, room: &str, id: ConnectionId) {
        if let Some(registry) = self.rooms.get(room).map(|r| r.clone()) {
            registry.remove_id(id);
        }
        if room != DEFAULT_ROOM {
            self.rooms.remove_if(room, |_, registry| registry.is_empty());
        }
    }

    /// Delete the room outright, detaching every member's own bookkeeping.
    pub fn remove(&self, room: &str) {
        if let Some((name, registry)) = self.rooms.remove(room) {
            for socket in registry.get_all() {
                socket.forget_room(&name);
            }
            tracing::debug!(room = %name, "Room removed");
        }
    }

    pub fn rooms(&self) -> Vec<(String, usize)> {
        self.rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }
}

/// Maps namespace path to its room registry. Namespaces are created lazily on
/// first use and live for the process lifetime.
#[derive(Default)]
pub struct NamespaceRegistry {
    namespaces: DashMap<String, Arc<RoomRegistry>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, namespace: &str, room: &str, socket: Arc<Socket>) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .add(room, socket);
    }

    /// The namespace's rooms, or an empty registry when it does not exist.
    pub fn get(&self, namespace: &str) -> Arc<RoomRegistry> {
        self.namespaces
            .get(namespace)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn remove(&self, namespace: &str, room: &str) {
        if let Some(registry) = self.namespaces.get(namespace).map(|r| r.clone()) {
            registry.remove(room);
        }
    }

    pub fn namespaces(&self) -> Vec<(String, Arc<RoomRegistry>)> {
        self.namespaces
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::transport::InProcessTransport;

    fn test_socket(namespaces: &Arc<NamespaceRegistry>) -> Arc<Socket> {
        let (transport, _peer) = InProcessTransport::pair();
        Socket::new("/test", Arc::new(transport), namespaces.clone())
    }

    #[test]
    fn socket_registry_add_get_remove_are_idempotent() {
        let namespaces = Arc::new(NamespaceRegistry::new());
        let registry = SocketRegistry::new();
        let socket = test_socket(&namespaces);

        registry.add(socket.clone());
        registry.add(socket.clone());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(socket.id()).is_some());

        registry.remove_id(socket.id());
        registry.remove_id(socket.id());
        assert!(registry.get(socket.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_room_yields_empty_registry() {
        let rooms = RoomRegistry::new();
        assert!(rooms.get("nowhere").is_empty());
        assert!(!rooms.contains("nowhere"));
    }

    #[test]
    fn empty_room_is_collected_after_last_member_leaves() {
        let namespaces = Arc::new(NamespaceRegistry::new());
        let rooms = RoomRegistry::new();
        let socket = test_socket(&namespaces);

        rooms.add("user:7", socket.clone());
        assert!(rooms.contains("user:7"));

        rooms.remove_socket("user:7", socket.id());
        assert!(!rooms.contains("user:7"));
        assert!(rooms.get("user:7").is_empty());
    }

    #[test]
    fn default_room_survives_becoming_empty() {
        let namespaces = Arc::new(NamespaceRegistry::new());
        let rooms = RoomRegistry::new();
        let socket = test_socket(&namespaces);

        rooms.add(DEFAULT_ROOM, socket.clone());
        rooms.remove_socket(DEFAULT_ROOM, socket.id());

        assert!(rooms.contains(DEFAULT_ROOM));
        assert!(rooms.get(DEFAULT_ROOM).is_empty());
    }

    #[test]
    fn room_removal_detaches_member_bookkeeping() {
        let namespaces = Arc::new(NamespaceRegistry::new());
        let socket = test_socket(&namespaces);
        socket.join("stale");
        assert!(socket.in_room("stale"));

        namespaces.get("/test").remove("stale");
        assert!(!socket.in_room("stale"));
    }

    #[test]
    fn namespace_get_never_returns_absent() {
        let namespaces = NamespaceRegistry::new();
        let rooms = namespaces.get("/ghost");
        assert!(rooms.get(DEFAULT_ROOM).is_empty());
    }
}
