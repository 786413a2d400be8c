//! In-process real-time connection/broadcast hub.
//!
//! Live connections are organized into namespaces and rooms; a chainable
//! [`BroadcastBuilder`] resolves recipient sets over them and pushes
//! `{event, payload}` frames. One tokio task per connection runs the
//! [`engine`] read loop; the registries are the only cross-connection shared
//! state and guard their maps internally, never across transport I/O.

pub mod broadcast;
pub mod engine;
pub mod frame;
pub mod registry;
pub mod server;
pub mod socket;
pub mod transport;

pub use broadcast::BroadcastBuilder;
pub use frame::Frame;
pub use registry::{NamespaceRegistry, RoomRegistry, SocketRegistry, DEFAULT_ROOM};
pub use server::{HubStats, SocketServer};
pub use socket::{ConnectionId, Socket, SocketState};
pub use transport::{InProcessTransport, Transport, TransportError, TransportPeer};
