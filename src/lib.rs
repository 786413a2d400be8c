// Infrastructure layer (shared components)
pub mod auth;
pub mod config;
pub mod error;

// Domain layer (the hub itself)
pub mod hub;

// Application layer
pub mod api;
pub mod events;
pub mod server;
pub mod websocket;
