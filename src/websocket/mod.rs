mod handler;
mod transport;

pub use handler::ws_handler;
pub use transport::WsTransport;
