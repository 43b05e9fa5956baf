//! Configuration management

use crate::error::{ErrorContext, SessionError, SessionResult};
use crate::logging::LoggingConfig;
use crate::types::{CookieParams, MAX_COOKIE_LIFETIME_SECS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What `destroy` does when no session is active yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyPolicy {
    /// Open the session (issuing a cookie if needed) and delete its record
    #[default]
    RequireActive,
    /// Do nothing when the client has no session
    SkipInactive,
}

/// Session identity and record settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Collection holding the session records
    pub collection: String,
    /// Name of the cookie carrying the session token
    pub cookie_key: String,
    /// Prefix mixed into generated tokens
    pub id_prefix: String,
    pub destroy_policy: DestroyPolicy,
    /// Use the backend's upsert for `set` instead of find-then-insert
    pub atomic_upsert: bool,
    /// Overrides merged over the default cookie parameters
    pub cookie_params: CookieParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collection: "persistent_session".to_string(),
            cookie_key: "session-id".to_string(),
            id_prefix: String::new(),
            destroy_policy: DestroyPolicy::RequireActive,
            atomic_upsert: true,
            cookie_params: CookieParams::empty(),
        }
    }
}

impl SessionConfig {
    /// Cookie parameters with the configured overrides applied over the defaults
    pub fn effective_cookie_params(&self) -> CookieParams {
        CookieParams::default().merged(&self.cookie_params)
    }

    pub fn validate(&self) -> SessionResult<()> {
        if !is_valid_collection_name(&self.collection) {
            return Err(invalid(
                format!("Invalid collection name: '{}'", self.collection),
                "Use letters, digits and underscores, not starting with a digit",
            ));
        }

        if !is_valid_cookie_name(&self.cookie_key) {
            return Err(invalid(
                format!("Invalid cookie key: '{}'", self.cookie_key),
                "Use a non-empty cookie name without separators or whitespace",
            ));
        }

        if !self.id_prefix.chars().all(is_cookie_value_char) {
            return Err(invalid(
                format!("Invalid id prefix: '{}'", self.id_prefix),
                "The prefix becomes part of the cookie value",
            ));
        }

        if let Some(lifetime) = self.cookie_params.lifetime {
            if lifetime > MAX_COOKIE_LIFETIME_SECS {
                return Err(invalid(
                    format!("Cookie lifetime too long: {}s", lifetime),
                    format!("Use at most {} seconds", MAX_COOKIE_LIFETIME_SECS),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Connection URL, e.g. `sqlite://data/sessions.db`
    pub database_url: Option<String>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersessionConfig {
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl PersessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SessionError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: PersessionConfig = toml::from_str(&content).map_err(|e| SessionError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SessionResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SessionError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| SessionError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> SessionResult<()> {
        self.session.validate()?;

        if self.storage.backend == StorageBackend::Sqlite
            && self
                .storage
                .database_url
                .as_deref()
                .map_or(true, str::is_empty)
        {
            return Err(invalid(
                "The sqlite backend requires storage.database_url".to_string(),
                "Set storage.database_url, e.g. sqlite://sessions.db",
            ));
        }

        Ok(())
    }
}

fn invalid(message: String, suggestion: impl Into<String>) -> SessionError {
    SessionError::Config {
        message,
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}

/// Collection names are interpolated into backend statements, so keep them to identifiers
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// RFC 6265 token characters
pub fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            c.is_ascii_graphic()
                && !matches!(
                    c,
                    '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '['
                        | ']' | '?' | '=' | '{' | '}'
                )
        })
}

fn is_cookie_value_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.collection, "persistent_session");
        assert_eq!(config.cookie_key, "session-id");
        assert_eq!(config.destroy_policy, DestroyPolicy::RequireActive);
        assert!(config.atomic_upsert);
        assert!(config.validate().is_ok());

        let params = config.effective_cookie_params();
        assert_eq!(params.http_only, Some(true));
        assert_eq!(params.secure, Some(true));
    }

    #[test]
    fn test_cookie_lifetime_is_bounded() {
        let mut config = SessionConfig::default();
        config.cookie_params.lifetime = Some(MAX_COOKIE_LIFETIME_SECS);
        assert!(config.validate().is_ok());

        config.cookie_params.lifetime = Some(u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SessionError::Config { .. }));
        assert!(err.to_string().contains("lifetime"));
    }

    #[test]
    fn test_collection_names() {
        assert!(is_valid_collection_name("persistent_session"));
        assert!(is_valid_collection_name("_sessions2"));
        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("2sessions"));
        assert!(!is_valid_collection_name("sessions; DROP TABLE x"));
        assert!(!is_valid_collection_name("my-sessions"));
    }

    #[test]
    fn test_cookie_names() {
        assert!(is_valid_cookie_name("session-id"));
        assert!(is_valid_cookie_name("__Host-sid"));
        assert!(!is_valid_cookie_name(""));
        assert!(!is_valid_cookie_name("session id"));
        assert!(!is_valid_cookie_name("a=b"));
    }

    #[test]
    fn test_invalid_session_config_is_config_error() {
        let config = SessionConfig {
            collection: "bad name".to_string(),
            ..SessionConfig::default()
        };

        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));
    }

    #[test]
    fn test_sqlite_requires_url() {
        let mut config = PersessionConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        assert!(config.validate().is_err());

        config.storage.database_url = Some("sqlite::memory:".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PersessionConfig = toml::from_str(
            r#"
            [session]
            cookie_key = "sid"

            [session.cookie_params]
            domain = "example.com"
            lifetime = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.session.cookie_key, "sid");
        assert_eq!(config.session.collection, "persistent_session");
        assert_eq!(config.storage.backend, StorageBackend::Memory);

        let params = config.session.effective_cookie_params();
        assert_eq!(params.domain.as_deref(), Some("example.com"));
        assert_eq!(params.lifetime, Some(3600));
        assert_eq!(params.secure, Some(true));
    }
}
