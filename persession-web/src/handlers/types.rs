//! Request and response types used by the handlers

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// Document store backend holding the sessions
    #[schema(example = "memory")]
    pub backend: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Error body returned by every failing endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Validation error: Session keys must not be empty")]
    pub error: String,
    #[schema(example = 400)]
    pub status: u16,
}

/// Full view of the caller's session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Session token, also delivered in the session cookie
    pub id: String,
    /// Number of stored items
    pub count: usize,
    /// Every stored item
    #[schema(value_type = Object)]
    pub entries: serde_json::Map<String, Value>,
}

/// One stored item
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    #[schema(example = "cart")]
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

/// Body of a write
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SetItemRequest {
    /// Any JSON value
    #[schema(value_type = Object)]
    pub value: Value,
}

/// Result of removing one item
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RemoveItemResponse {
    pub key: String,
    /// Value stored before the removal, if any
    #[schema(value_type = Option<Object>)]
    pub previous: Option<Value>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DestroyResponse {
    /// Whether a session record existed
    pub destroyed: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegenerateResponse {
    /// The new session token
    pub id: String,
}
