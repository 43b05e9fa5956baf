//! Route definitions for the persession web server

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/session",
            get(handlers::get_session).delete(handlers::destroy_session),
        )
        .route("/session/regenerate", post(handlers::regenerate_session))
        // Session items
        .route("/session/items", delete(handlers::clear_items))
        .route(
            "/session/items/{key}",
            get(handlers::get_item)
                .put(handlers::set_item)
                .delete(handlers::remove_item),
        )
        // API documentation
        .route("/openapi.json", get(openapi::openapi_json))
}
