use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use super::registry::{NamespaceRegistry, DEFAULT_NAMESPACE, DEFAULT_ROOM};
use super::socket::{ConnectionId, Socket};

/// Immutable recipient query over a namespace registry.
///
/// Every method layers a new value on the previous one; the builder itself is
/// a cheap snapshot of small sets and takes no locks. Resolution reads the
/// registries only when [`sockets`](Self::sockets) or [`emit`](Self::emit)
/// runs:
///
/// `(explicit ids ∪ included-room members) − (excluded-room members ∪ excluded ids)`
///
/// With no inclusion criteria at all, the namespace's default room resolves,
/// i.e. every open socket of the namespace.
#[derive(Clone)]
pub struct BroadcastBuilder {
    namespaces: Arc<NamespaceRegistry>,
    namespace: String,
    rooms: HashSet<String>,
    socket_ids: HashSet<ConnectionId>,
    without_rooms: HashSet<String>,
    without_ids: HashSet<ConnectionId>,
}

impl BroadcastBuilder {
    pub fn new(namespaces: Arc<NamespaceRegistry>) -> Self {
        Self {
            namespaces,
            namespace: DEFAULT_NAMESPACE.to_string(),
            rooms: HashSet::new(),
            socket_ids: HashSet::new(),
            without_rooms: HashSet::new(),
            without_ids: HashSet::new(),
        }
    }

    /// Target a namespace path.
    pub fn of(&self, namespace: &str) -> Self {
        let mut next = self.clone();
        next.namespace = namespace.to_string();
        next
    }

    /// Union a room into the inclusion criteria.
    pub fn to_room(&self, room: &str) -> Self {
        let mut next = self.clone();
        next.rooms.insert(room.to_string());
        next
    }

    /// Union several rooms into the inclusion criteria.
    pub fn to_rooms<I, S>(&self, rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.rooms.extend(rooms.into_iter().map(Into::into));
        next
    }

    /// Union an explicit connection id into the inclusion criteria.
    pub fn to(&self, id: ConnectionId) -> Self {
        let mut next = self.clone();
        next.socket_ids.insert(id);
        next
    }

    /// Exclude every member of a room from the resolved set.
    pub fn without_room(&self, room: &str) -> Self {
        let mut next = self.clone();
        next.without_rooms.insert(room.to_string());
        next
    }

    /// Exclude an explicit connection id from the resolved set.
    pub fn without_conn(&self, id: ConnectionId) -> Self {
        let mut next = self.clone();
        next.without_ids.insert(id);
        next
    }

    /// Resolve the recipient set without emitting. Each registry read is
    /// internally consistent; no atomicity spans the whole resolution.
    pub fn sockets(&self) -> Vec<Arc<Socket>> {
        let rooms = self.namespaces.get(&self.namespace);

        let mut selected: HashMap<ConnectionId, Arc<Socket>> = HashMap::new();
        if self.rooms.is_empty() && self.socket_ids.is_empty() {
            for socket in rooms.get(DEFAULT_ROOM).get_all() {
                selected.insert(socket.id(), socket);
            }
        } else {
            for id in &self.socket_ids {
                if let Some(socket) = rooms.get_socket(DEFAULT_ROOM, *id) {
                    selected.insert(*id, socket);
                }
            }
            for room in &self.rooms {
                for socket in rooms.get(room).get_all() {
                    selected.insert(socket.id(), socket);
                }
            }
        }

        let mut excluded: HashSet<ConnectionId> = self.without_ids.clone();
        for room in &self.without_rooms {
            for socket in rooms.get(room).get_all() {
                excluded.insert(socket.id());
            }
        }

        selected
            .into_values()
            .filter(|socket| !excluded.contains(&socket.id()))
            .collect()
    }

    /// Resolve and deliver `{event, payload}` to every recipient. One failed
    /// delivery never aborts the rest; a socket vanishing between resolution
    /// and emit fails only its own delivery, silently.
    #[tracing::instrument(
        name = "broadcast.emit",
        skip(self, payload),
        fields(namespace = %self.namespace, event = %event)
    )]
    pub async fn emit(&self, event: &str, payload: Value) {
        let recipients = self.sockets();
        let mut delivered = 0usize;
        let mut failed = 0usize;

        for socket in &recipients {
            match socket.emit(event, payload.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::debug!(
                        connection_id = %socket.id(),
                        error = %e,
                        "Broadcast delivery failed"
                    );
                }
            }
        }

        tracing::debug!(
            resolved = recipients.len(),
            delivered = delivered,
            failed = failed,
            "Broadcast emitted"
        );
    }

    /// Administrative eviction: clear the room's bookkeeping for every member
    /// and delete it.
    pub fn remove_room(&self, room: &str) {
        self.namespaces.remove(&self.namespace, room);
    }
}
