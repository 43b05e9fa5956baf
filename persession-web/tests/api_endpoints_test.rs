//! Session API endpoint tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use persession_core::{PersessionConfig, SessionConfig, StorageBackend};
use persession_store::{MemoryDocumentStore, SessionManager};
use persession_web::{create_app, AppState, WebConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn spawn_app() -> Router {
    let manager =
        SessionManager::new(SessionConfig::default(), Arc::new(MemoryDocumentStore::new()))
            .unwrap();
    create_app(AppState::from_manager(WebConfig::default(), manager))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string())
}

/// `name=value` part of a `Set-Cookie` header
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

#[tokio::test]
async fn test_first_write_issues_session_cookie() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/cart",
        None,
        Some(json!({"value": [1, 2, 3]})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let header = set_cookie(&response).expect("session cookie");
    assert!(header.starts_with("session-id="));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Secure"));
    assert!(header.contains("Path=/"));
    assert!(header.contains("Expires="));

    let body = json_body(response).await;
    assert_eq!(body["key"], "cart");
    assert_eq!(body["value"], json!([1, 2, 3]));
}

#[tokio::test]
async fn test_session_persists_through_cookie() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/theme",
        None,
        Some(json!({"value": "dark"})),
    )
    .await;
    let cookie = cookie_pair(&set_cookie(&response).unwrap());

    let response = send(&app, Method::GET, "/api/session/items/theme", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert_eq!(json_body(response).await["value"], "dark");

    let response = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"], json!({"theme": "dark"}));
    assert_eq!(format!("session-id={}", body["id"].as_str().unwrap()), cookie);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let app = spawn_app();

    let response = send(&app, Method::GET, "/api/session/items/nothing", None, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["status"], 404);
}

#[tokio::test]
async fn test_remove_and_clear_items() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/a",
        None,
        Some(json!({"value": 1})),
    )
    .await;
    let cookie = cookie_pair(&set_cookie(&response).unwrap());
    send(&app, Method::PUT, "/api/session/items/b", Some(&cookie), Some(json!({"value": 2}))).await;

    let response = send(&app, Method::DELETE, "/api/session/items/a", Some(&cookie), None).await;
    let body = json_body(response).await;
    assert_eq!(body["previous"], 1);

    let response = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
    assert_eq!(json_body(response).await["count"], 1);

    let response = send(&app, Method::DELETE, "/api/session/items", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).is_none());

    let response = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
    assert_eq!(json_body(response).await["count"], 0);
}

#[tokio::test]
async fn test_destroy_session() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/user",
        None,
        Some(json!({"value": "alice"})),
    )
    .await;
    let cookie = cookie_pair(&set_cookie(&response).unwrap());

    let response = send(&app, Method::DELETE, "/api/session", Some(&cookie), None).await;
    assert_eq!(json_body(response).await["destroyed"], true);

    let response = send(&app, Method::GET, "/api/session/items/user", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, "/api/session", Some(&cookie), None).await;
    assert_eq!(json_body(response).await["destroyed"], false);
}

#[tokio::test]
async fn test_regenerate_keeps_items() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/user",
        None,
        Some(json!({"value": "alice"})),
    )
    .await;
    let old_cookie = cookie_pair(&set_cookie(&response).unwrap());

    let response = send(&app, Method::POST, "/api/session/regenerate", Some(&old_cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let new_cookie = cookie_pair(&set_cookie(&response).unwrap());
    assert_ne!(old_cookie, new_cookie);
    let body = json_body(response).await;
    assert_eq!(format!("session-id={}", body["id"].as_str().unwrap()), new_cookie);

    let response = send(&app, Method::GET, "/api/session/items/user", Some(&new_cookie), None).await;
    assert_eq!(json_body(response).await["value"], "alice");

    let response = send(&app, Method::GET, "/api/session/items/user", Some(&old_cookie), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserved_key_is_bad_request() {
    let app = spawn_app();

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/_id",
        None,
        Some(json!({"value": "hijack"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = spawn_app();

    let response = send(&app, Method::GET, "/api/openapi.json", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Persession Web API");
    assert!(body["paths"]["/api/session/items/{key}"].is_object());
}

#[tokio::test]
async fn test_sqlite_backed_app() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = PersessionConfig::default();
    settings.storage.backend = StorageBackend::Sqlite;
    settings.storage.database_url = Some(format!(
        "sqlite://{}",
        dir.path().join("sessions.db").display()
    ));
    let manager = SessionManager::connect(&settings).await.unwrap();
    let app = create_app(AppState::from_manager(WebConfig::default(), manager));

    let response = send(
        &app,
        Method::PUT,
        "/api/session/items/cart",
        None,
        Some(json!({"value": {"items": 3}})),
    )
    .await;
    let cookie = cookie_pair(&set_cookie(&response).unwrap());

    let response = send(&app, Method::GET, "/api/session/items/cart", Some(&cookie), None).await;
    assert_eq!(json_body(response).await["value"], json!({"items": 3}));

    let response = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(json_body(response).await["backend"], "sqlite");
}
