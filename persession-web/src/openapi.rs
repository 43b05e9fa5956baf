//! OpenAPI document for the persession web server

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{
    DestroyResponse, ErrorResponse, HealthResponse, ItemResponse, RegenerateResponse,
    RemoveItemResponse, SessionResponse, SetItemRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Persession Web API",
        version = "0.1.0",
        description = "Cookie-identified sessions persisted in a document store",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::get_session,
        crate::handlers::destroy_session,
        crate::handlers::regenerate_session,
        crate::handlers::get_item,
        crate::handlers::set_item,
        crate::handlers::remove_item,
        crate::handlers::clear_items,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            SessionResponse,
            ItemResponse,
            SetItemRequest,
            RemoveItemResponse,
            DestroyResponse,
            RegenerateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Session", description = "Operations on the caller's session")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_session_paths() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;

        assert!(paths.contains_key("/api/health"));
        assert!(paths.contains_key("/api/session"));
        assert!(paths.contains_key("/api/session/items"));
        assert!(paths.contains_key("/api/session/items/{key}"));
        assert!(paths.contains_key("/api/session/regenerate"));
    }
}
