use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body shape the admin API promises: `{"Error": <message>}`.
#[derive(Serialize)]
struct ErrorResponse {
    #[serde(rename = "Error")]
    error: String,
}

// Detailed messages of server-side faults stay in the logs in production.
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        let (status, client_message) = match &self {
            AppError::Config(_) | AppError::Internal(_) => {
                let msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    detail.clone()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        tracing::error!(
            status = %status.as_u16(),
            message = %detail,
            "API error"
        );

        let body = ErrorResponse {
            error: client_message,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
