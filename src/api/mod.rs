mod broadcast;
mod health;
mod routes;

pub use broadcast::{broadcast, BroadcastRequest, StatusResponse};
pub use health::{health, stats};
pub use routes::api_routes;
