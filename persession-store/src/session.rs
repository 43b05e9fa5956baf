//! Request-scoped session handle
//!
//! A [`Session`] pairs the identity of one request with the shared record store.
//! Every record operation establishes the identity first (issuing a token and cookie
//! when the client has none) and then addresses the record by that token.

use crate::identity::SessionIdentity;
use crate::record::RecordStore;
use persession_core::{
    CookieParams, CookieTransport, DestroyPolicy, Document, SessionPresence, SessionResult,
    SessionToken,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

pub struct Session<T> {
    identity: SessionIdentity,
    records: RecordStore,
    destroy_policy: DestroyPolicy,
    transport: T,
}

impl<T: CookieTransport> Session<T> {
    pub(crate) fn new(
        identity: SessionIdentity,
        records: RecordStore,
        destroy_policy: DestroyPolicy,
        transport: T,
    ) -> Self {
        Self {
            identity,
            records,
            destroy_policy,
            transport,
        }
    }

    pub fn presence(&self) -> &SessionPresence {
        self.identity.presence()
    }

    /// Whether the request already has a session. Never creates one.
    pub fn is_active(&self) -> SessionResult<bool> {
        self.identity.is_active(&self.transport)
    }

    /// Establish the session, issuing a token and cookie if the client has none
    pub fn open(&mut self) -> SessionResult<SessionToken> {
        self.identity.open(&mut self.transport)
    }

    /// Current token without creating a session
    pub fn id(&mut self) -> SessionResult<Option<SessionToken>> {
        self.identity.id(&self.transport)
    }

    /// Adopt an existing token; no cookie is written
    pub fn set_id(&mut self, token: impl Into<SessionToken>) {
        self.identity.set_id(token.into());
    }

    /// Merge cookie attribute overrides for cookies issued by this session
    pub fn set_cookie_params(&mut self, overrides: &CookieParams) {
        self.identity.set_cookie_params(overrides);
    }

    pub async fn get(&mut self, key: &str) -> SessionResult<Option<Value>> {
        let token = self.open()?;
        self.records.get(&token, key).await
    }

    /// Value of `key`, or `default` when nothing is stored under it
    pub async fn get_or(&mut self, key: &str, default: impl Into<Value>) -> SessionResult<Value> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.into()))
    }

    /// Typed read; a stored value of another shape is a serialization error
    pub async fn get_as<V: DeserializeOwned>(&mut self, key: &str) -> SessionResult<Option<V>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn has(&mut self, key: &str) -> SessionResult<bool> {
        let token = self.open()?;
        self.records.has(&token, key).await
    }

    /// Number of stored items
    pub async fn count(&mut self) -> SessionResult<usize> {
        let token = self.open()?;
        self.records.count(&token).await
    }

    /// Every stored item
    pub async fn entries(&mut self) -> SessionResult<Document> {
        let token = self.open()?;
        self.records.entries(&token).await
    }

    /// Store `value` under `key`, overwriting any previous value
    pub async fn set<V: Serialize>(&mut self, key: &str, value: V) -> SessionResult<()> {
        let value = serde_json::to_value(value)?;
        let token = self.open()?;
        self.records.set(&token, key, value).await
    }

    /// Remove `key`, returning what was stored under it
    pub async fn remove(&mut self, key: &str) -> SessionResult<Option<Value>> {
        let token = self.open()?;
        self.records.remove(&token, key).await
    }

    /// Remove every item; the session and its (now empty) record remain
    pub async fn remove_all(&mut self) -> SessionResult<()> {
        let token = self.open()?;
        self.records.remove_all(&token).await
    }

    /// Delete the session record. Returns whether a record existed.
    pub async fn destroy(&mut self) -> SessionResult<bool> {
        let token = match self.destroy_policy {
            DestroyPolicy::RequireActive => self.open()?,
            DestroyPolicy::SkipInactive => match self.id()? {
                Some(token) => token,
                None => {
                    debug!("No active session to destroy");
                    return Ok(false);
                }
            },
        };
        self.records.destroy(&token).await
    }

    /// Replace the token with a fresh one, carrying the stored items over.
    ///
    /// The new token is only cached and sent once the record has moved; on error the
    /// session keeps its previous token.
    pub async fn regenerate_id(&mut self) -> SessionResult<SessionToken> {
        let Some(old) = self.identity.id(&self.transport)? else {
            return self.open();
        };

        let new = self.identity.generate();
        let moved = self.records.rename(&old, &new).await?;

        if let Err(e) = self.identity.deliver(&mut self.transport, new.clone()) {
            if moved {
                if let Err(undo) = self.records.rename(&new, &old).await {
                    warn!(error = %undo, "Failed to move session record back");
                }
            }
            return Err(e);
        }

        info!(moved, "Regenerated session token");
        Ok(new)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Finish the request, handing back the transport with any pending cookies
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("presence", self.identity.presence())
            .field("records", &self.records)
            .field("destroy_policy", &self.destroy_policy)
            .finish_non_exhaustive()
    }
}
