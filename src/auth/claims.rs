use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token claims the chat backend issues. The hub only cares about the session
/// identifier and the numeric user id, which become room names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Session identifier for the issuing login
    pub session_id: String,
    /// Numeric user identifier
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Additional claims carried but not interpreted here
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Room name for this user, shared by all their sessions.
    pub fn user_room(&self) -> String {
        self.user_id.to_string()
    }

    /// Room name for exactly this session.
    pub fn session_room(&self) -> &str {
        &self.session_id
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}
