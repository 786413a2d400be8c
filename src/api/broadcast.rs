use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::events::CHAT_NAMESPACE;
use crate::server::AppState;

/// Administrative broadcast request. User ids map to user rooms; the
/// originating session is excluded so the sender gets no echo.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub user_ids: Vec<i64>,
    pub session_id: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl BroadcastRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.session_id.is_empty() {
            return Err(AppError::Validation("session_id must not be empty".into()));
        }
        if self.event.is_empty() {
            return Err(AppError::Validation("event must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "Ok")]
    pub ok: bool,
}

/// `POST /broadcast` — push an event to every connection of the targeted
/// users except the originating session. Validation failures answer 400
/// before any resolution or delivery happens.
#[tracing::instrument(name = "api.broadcast", skip(state, payload))]
pub async fn broadcast(
    State(state): State<AppState>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    request.validate()?;

    let rooms: Vec<String> = request.user_ids.iter().map(|id| id.to_string()).collect();

    tracing::info!(
        users = request.user_ids.len(),
        session_id = %request.session_id,
        event = %request.event,
        "Admin broadcast"
    );

    state
        .socket_server
        .broadcast()
        .of(CHAT_NAMESPACE)
        .to_rooms(rooms)
        .without_room(&request.session_id)
        .emit(&request.event, request.payload)
        .await;

    Ok(Json(StatusResponse { ok: true }))
}
