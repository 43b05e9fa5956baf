//! Session Manager - shared entry point that hands out request-scoped sessions

use crate::backend;
use crate::identity::SessionIdentity;
use crate::record::RecordStore;
use crate::session::Session;
use persession_core::{CookieTransport, DocumentStore, PersessionConfig, SessionConfig, SessionResult};
use std::sync::Arc;
use tracing::info;

/// Process-wide session factory.
///
/// Holds configuration and the record store; it never holds a token. Call
/// [`SessionManager::session`] once per request with that request's transport.
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: Arc<SessionConfig>,
    records: RecordStore,
}

impl SessionManager {
    /// Create a manager over an already prepared document store
    pub fn new(config: SessionConfig, store: Arc<dyn DocumentStore>) -> SessionResult<Self> {
        config.validate()?;

        let records = RecordStore::new(store, config.collection.clone())
            .with_atomic_upsert(config.atomic_upsert);

        Ok(Self {
            config: Arc::new(config),
            records,
        })
    }

    /// Connect the configured backend and prepare the session collection
    pub async fn connect(config: &PersessionConfig) -> SessionResult<Self> {
        config.validate()?;

        let store = backend::connect(&config.storage).await?;
        store.prepare_collection(&config.session.collection).await?;

        info!(
            backend = store.name(),
            collection = %config.session.collection,
            "Session store initialized"
        );

        Self::new(config.session.clone(), store)
    }

    /// Start a session for one request
    pub fn session<T: CookieTransport>(&self, transport: T) -> Session<T> {
        Session::new(
            SessionIdentity::new(&self.config),
            self.records.clone(),
            self.config.destroy_policy,
            transport,
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryDocumentStore;
    use crate::transport::MemoryTransport;
    use persession_core::{DestroyPolicy, SessionError, SessionToken};
    use serde_json::json;

    fn manager(config: SessionConfig) -> SessionManager {
        SessionManager::new(config, Arc::new(MemoryDocumentStore::new())).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SessionConfig {
            cookie_key: String::new(),
            ..SessionConfig::default()
        };

        assert!(matches!(
            SessionManager::new(config, Arc::new(MemoryDocumentStore::new())),
            Err(SessionError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_identity() {
        let manager = manager(SessionConfig::default());

        let mut first = manager.session(MemoryTransport::new());
        let mut second = manager.session(MemoryTransport::new());

        first.set("user", "alice").await.unwrap();
        second.set("user", "bob").await.unwrap();

        assert_ne!(first.id().unwrap(), second.id().unwrap());
        assert_eq!(first.get("user").await.unwrap(), Some(json!("alice")));
        assert_eq!(second.get("user").await.unwrap(), Some(json!("bob")));
    }

    #[tokio::test]
    async fn test_follow_up_request_sees_stored_items() {
        let manager = manager(SessionConfig::default());

        let mut first = manager.session(MemoryTransport::new());
        first.set("cart", vec![1, 2, 3]).await.unwrap();
        let cookie = first.into_transport().take_outbound().remove(0);

        let mut second = manager.session(MemoryTransport::with_cookie(cookie.name, cookie.value));
        assert_eq!(
            second.get_as::<Vec<i32>>("cart").await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(second.transport().outbound().is_empty());
    }

    #[tokio::test]
    async fn test_skip_inactive_destroy_policy() {
        let manager = manager(SessionConfig {
            destroy_policy: DestroyPolicy::SkipInactive,
            ..SessionConfig::default()
        });

        let mut session = manager.session(MemoryTransport::new());
        assert!(!session.destroy().await.unwrap());
        assert!(!session.is_active().unwrap());
        assert!(session.transport().outbound().is_empty());

        session.set_id(SessionToken::new("abc"));
        session.set("a", 1).await.unwrap();
        assert!(session.destroy().await.unwrap());
    }

    #[tokio::test]
    async fn test_require_active_destroy_policy_opens() {
        let manager = manager(SessionConfig::default());

        let mut session = manager.session(MemoryTransport::new());
        assert!(!session.destroy().await.unwrap());
        assert!(session.is_active().unwrap());
        assert_eq!(session.transport().outbound().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let manager = SessionManager::connect(&PersessionConfig::default())
            .await
            .unwrap();

        assert_eq!(manager.records().backend().name(), "memory");
        assert_eq!(manager.records().collection(), "persistent_session");
    }
}
