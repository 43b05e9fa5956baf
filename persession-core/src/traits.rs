//! Core trait definitions

use crate::error::{SessionError, SessionResult};
use crate::types::{Document, OutboundCookie, SessionToken, UpdateOp, PRIMARY_KEY};
use async_trait::async_trait;

/// Document database holding one record per session token.
///
/// Every method is a single round trip against `collection`, addressed by primary key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Create or index the collection before first use
    async fn prepare_collection(&self, _collection: &str) -> SessionResult<()> {
        Ok(())
    }

    /// Fetch the document with the given primary key, `_id` included
    async fn find(&self, collection: &str, id: &SessionToken) -> SessionResult<Option<Document>>;

    /// Insert a new document. It must carry a string `_id`.
    ///
    /// Fails with [`SessionError::Conflict`] when the primary key is taken.
    async fn insert(&self, collection: &str, document: Document) -> SessionResult<()>;

    /// Apply a partial update, returning the number of matched documents (0 or 1)
    async fn update(&self, collection: &str, id: &SessionToken, op: UpdateOp)
        -> SessionResult<u64>;

    /// Delete the document, returning the number of deleted documents (0 or 1)
    async fn delete(&self, collection: &str, id: &SessionToken) -> SessionResult<u64>;

    /// Set `fields` on the document, creating it when absent.
    ///
    /// The default is a check-then-act sequence and is not atomic. Backends with a
    /// native upsert override it.
    async fn upsert(
        &self,
        collection: &str,
        id: &SessionToken,
        fields: Document,
    ) -> SessionResult<()> {
        if self.find(collection, id).await?.is_some() {
            self.update(collection, id, UpdateOp::Set(fields)).await?;
        } else {
            let mut document = Document::new();
            document.insert(
                PRIMARY_KEY.to_string(),
                serde_json::Value::String(id.as_str().to_string()),
            );
            document.extend(fields);
            self.insert(collection, document).await?;
        }
        Ok(())
    }

    /// Whether [`DocumentStore::upsert`] is atomic for this backend
    fn atomic_upsert(&self) -> bool {
        false
    }
}

/// Per-request cookie transport.
///
/// Reads the inbound session cookie and collects outbound cookies for the response.
pub trait CookieTransport: Send {
    /// Value of the inbound cookie `name`, if the client sent one
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>>;

    /// Schedule a cookie for delivery to the client
    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()>;
}

impl<T: CookieTransport + ?Sized> CookieTransport for &mut T {
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>> {
        (**self).inbound_cookie(name)
    }

    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()> {
        (**self).add_cookie(cookie)
    }
}

impl<T: CookieTransport + ?Sized> CookieTransport for Box<T> {
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>> {
        (**self).inbound_cookie(name)
    }

    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()> {
        (**self).add_cookie(cookie)
    }
}

/// Extract the string primary key of a document about to be inserted
pub fn document_id(document: &Document) -> SessionResult<SessionToken> {
    match document.get(PRIMARY_KEY) {
        Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(SessionToken::new(id.clone())),
        _ => Err(SessionError::Validation {
            message: "Document is missing a string primary key".to_string(),
            field: Some(PRIMARY_KEY.to_string()),
            context: crate::ErrorContext::new("document_store").with_operation("insert"),
        }),
    }
}
