use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::broadcast::broadcast;
use super::health::{health, stats};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/broadcast", post(broadcast))
}
