//! Persession Web Server
//!
//! Exposes the session operations of one cookie-identified client over HTTP.

pub mod extractor;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod transport;

// Re-export main types
pub use extractor::WebSession;
pub use server::PersessionServer;
pub use state::AppState;
pub use transport::JarTransport;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use persession_core::SessionError;
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB max body size
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path of the TOML configuration file (optional)
    pub config_path: Option<String>,
    /// Database URL; selects the sqlite backend when set
    pub database_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            config_path: None,
            database_url: None,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PERSESSION_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PERSESSION_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8080),
            config_path: std::env::var("PERSESSION_CONFIG").ok(),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Session(SessionError::Validation { .. }) => StatusCode::BAD_REQUEST,
            WebError::Session(SessionError::Conflict { .. }) => StatusCode::CONFLICT,
            WebError::Session(SessionError::Storage { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                WebError::Session(e) => e.log(),
                e => tracing::error!("Request failed: {}", e),
            }
        }

        let body = handlers::ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
