//! Shared application state

use crate::{WebConfig, WebError, WebResult};
use persession_core::{PersessionConfig, StorageBackend};
use persession_store::SessionManager;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: WebConfig,
    /// Session factory shared by all requests
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Build the state from the web configuration, connecting the session backend
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let settings = load_settings(&config)?;
        let sessions = SessionManager::connect(&settings).await?;

        info!(
            collection = %sessions.config().collection,
            cookie = %sessions.config().cookie_key,
            "Session manager ready"
        );

        Ok(Self::from_manager(config, sessions))
    }

    /// Wrap an existing manager
    pub fn from_manager(config: WebConfig, sessions: SessionManager) -> Self {
        Self {
            config,
            sessions: Arc::new(sessions),
        }
    }
}

/// Read the TOML file named by the web configuration, then apply the database URL
pub fn load_settings(config: &WebConfig) -> WebResult<PersessionConfig> {
    let mut settings = match &config.config_path {
        Some(path) => PersessionConfig::from_file(path)?,
        None => PersessionConfig::default(),
    };

    if let Some(url) = &config.database_url {
        settings.storage.backend = StorageBackend::Sqlite;
        settings.storage.database_url = Some(url.clone());
    }

    settings
        .validate()
        .map_err(|e| WebError::Config(e.to_string()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_selects_sqlite() {
        let config = WebConfig {
            database_url: Some("sqlite::memory:".to_string()),
            ..WebConfig::default()
        };

        let settings = load_settings(&config).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            settings.storage.database_url.as_deref(),
            Some("sqlite::memory:")
        );
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let config = WebConfig {
            config_path: Some("/nonexistent/persession.toml".to_string()),
            ..WebConfig::default()
        };

        assert!(load_settings(&config).is_err());
    }

    #[tokio::test]
    async fn test_state_with_memory_backend() {
        let state = AppState::new(WebConfig::default()).await.unwrap();
        assert_eq!(state.sessions.records().backend().name(), "memory");
    }
}
