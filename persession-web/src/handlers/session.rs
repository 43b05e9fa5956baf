//! Session handlers
//!
//! Every handler works on the caller's own session. A request without a session cookie
//! gets a session (and a `Set-Cookie`) as soon as a handler touches it.

use super::types::{
    DestroyResponse, ErrorResponse, ItemResponse, RegenerateResponse, RemoveItemResponse,
    SessionResponse, SetItemRequest,
};
use crate::{JarTransport, WebError, WebResult, WebSession};
use axum::{extract::Path, http::StatusCode, response::Json};
use tracing::debug;

/// Get the whole session
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Session",
    summary = "Get session",
    description = "Return the session token together with every stored item",
    responses(
        (status = 200, description = "Session contents", body = SessionResponse),
        (status = 503, description = "Session storage unavailable", body = ErrorResponse)
    )
)]
pub async fn get_session(
    mut session: WebSession,
) -> WebResult<(JarTransport, Json<SessionResponse>)> {
    let id = session.open()?;
    let entries = session.entries().await?;

    let response = SessionResponse {
        id: id.into_inner(),
        count: entries.len(),
        entries,
    };
    Ok((session.finish(), Json(response)))
}

/// Get one item
#[utoipa::path(
    get,
    path = "/api/session/items/{key}",
    tag = "Session",
    summary = "Get item",
    params(("key" = String, Path, description = "Item key")),
    responses(
        (status = 200, description = "Stored value", body = ItemResponse),
        (status = 404, description = "No value stored under the key", body = ErrorResponse)
    )
)]
pub async fn get_item(
    mut session: WebSession,
    Path(key): Path<String>,
) -> WebResult<(JarTransport, Json<ItemResponse>)> {
    let value = session
        .get(&key)
        .await?
        .ok_or_else(|| WebError::NotFound(format!("session item '{}'", key)))?;

    Ok((session.finish(), Json(ItemResponse { key, value })))
}

/// Store one item
#[utoipa::path(
    put,
    path = "/api/session/items/{key}",
    tag = "Session",
    summary = "Set item",
    params(("key" = String, Path, description = "Item key")),
    request_body = SetItemRequest,
    responses(
        (status = 200, description = "Value stored", body = ItemResponse),
        (status = 400, description = "Invalid key", body = ErrorResponse),
        (status = 409, description = "Session record created concurrently", body = ErrorResponse)
    )
)]
pub async fn set_item(
    mut session: WebSession,
    Path(key): Path<String>,
    Json(request): Json<SetItemRequest>,
) -> WebResult<(JarTransport, Json<ItemResponse>)> {
    session.set(&key, &request.value).await?;
    debug!(key = %key, "Stored session item");

    let response = ItemResponse {
        key,
        value: request.value,
    };
    Ok((session.finish(), Json(response)))
}

/// Remove one item
#[utoipa::path(
    delete,
    path = "/api/session/items/{key}",
    tag = "Session",
    summary = "Remove item",
    params(("key" = String, Path, description = "Item key")),
    responses(
        (status = 200, description = "Item removed", body = RemoveItemResponse),
        (status = 400, description = "Invalid key", body = ErrorResponse)
    )
)]
pub async fn remove_item(
    mut session: WebSession,
    Path(key): Path<String>,
) -> WebResult<(JarTransport, Json<RemoveItemResponse>)> {
    let previous = session.remove(&key).await?;
    Ok((session.finish(), Json(RemoveItemResponse { key, previous })))
}

/// Remove every item
#[utoipa::path(
    delete,
    path = "/api/session/items",
    tag = "Session",
    summary = "Clear session",
    description = "Remove every item while keeping the session itself",
    responses(
        (status = 204, description = "Session cleared")
    )
)]
pub async fn clear_items(mut session: WebSession) -> WebResult<(StatusCode, JarTransport, ())> {
    session.remove_all().await?;
    Ok((StatusCode::NO_CONTENT, session.finish(), ()))
}

/// Destroy the session record
#[utoipa::path(
    delete,
    path = "/api/session",
    tag = "Session",
    summary = "Destroy session",
    responses(
        (status = 200, description = "Session record deleted", body = DestroyResponse)
    )
)]
pub async fn destroy_session(
    mut session: WebSession,
) -> WebResult<(JarTransport, Json<DestroyResponse>)> {
    let destroyed = session.destroy().await?;
    Ok((session.finish(), Json(DestroyResponse { destroyed })))
}

/// Issue a new session token, keeping the stored items
#[utoipa::path(
    post,
    path = "/api/session/regenerate",
    tag = "Session",
    summary = "Regenerate session id",
    responses(
        (status = 200, description = "New token issued", body = RegenerateResponse),
        (status = 409, description = "Token collision", body = ErrorResponse)
    )
)]
pub async fn regenerate_session(
    mut session: WebSession,
) -> WebResult<(JarTransport, Json<RegenerateResponse>)> {
    let id = session.regenerate_id().await?;
    Ok((
        session.finish(),
        Json(RegenerateResponse {
            id: id.into_inner(),
        }),
    ))
}
