use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use super::broadcast::BroadcastBuilder;
use super::registry::{NamespaceRegistry, DEFAULT_ROOM};
use super::socket::Socket;
use super::transport::Transport;

type SetupFn = Arc<dyn Fn(Arc<Socket>) + Send + Sync>;

/// Façade composing the hub: namespace setup callbacks, connection attach
/// and the broadcast entry point.
pub struct SocketServer {
    namespaces: Arc<NamespaceRegistry>,
    setups: DashMap<String, SetupFn>,
}

impl SocketServer {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(NamespaceRegistry::new()),
            setups: DashMap::new(),
        }
    }

    /// Associate a namespace with a setup callback that runs once per new
    /// socket, before its `connected` event. Registration must precede
    /// connections on that path: already-open sockets are not revisited.
    pub fn register<F>(&self, namespace: &str, setup: F)
    where
        F: Fn(Arc<Socket>) + Send + Sync + 'static,
    {
        self.setups.insert(namespace.to_string(), Arc::new(setup));
        tracing::info!(namespace = %namespace, "Namespace registered");
    }

    /// Create the socket for an upgraded connection: register it into the
    /// namespace's default room, run the namespace setup and open it. The
    /// caller drives the read loop with [`engine::run`](super::engine::run).
    pub fn attach(&self, namespace: &str, transport: Arc<dyn Transport>) -> Arc<Socket> {
        let socket = Socket::new(namespace, transport, self.namespaces.clone());
        self.namespaces.add(namespace, DEFAULT_ROOM, socket.clone());

        if let Some(setup) = self.setups.get(namespace).map(|s| s.clone()) {
            setup(socket.clone());
        }
        socket.mark_open();

        tracing::info!(
            connection_id = %socket.id(),
            namespace = %namespace,
            "Socket attached"
        );
        socket
    }

    /// Fresh broadcast builder rooted at this server's namespace registry.
    pub fn broadcast(&self) -> BroadcastBuilder {
        BroadcastBuilder::new(self.namespaces.clone())
    }

    pub fn stats(&self) -> HubStats {
        let mut namespaces = HashMap::new();
        for (path, rooms) in self.namespaces.namespaces() {
            let mut room_sizes = HashMap::new();
            let mut sockets = 0;
            for (room, members) in rooms.rooms() {
                if room == DEFAULT_ROOM {
                    sockets = members;
                } else {
                    room_sizes.insert(room, members);
                }
            }
            namespaces.insert(
                path,
                NamespaceStats {
                    sockets,
                    rooms: room_sizes,
                },
            );
        }
        HubStats { namespaces }
    }
}

impl Default for SocketServer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    pub namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    /// Open sockets of the namespace (default room membership).
    pub sockets: usize,
    /// Named rooms and their member counts.
    pub rooms: HashMap<String, usize>,
}
