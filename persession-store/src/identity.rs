//! Session identity - establishes and caches the session token of one request

use chrono::Utc;
use persession_core::{
    CookieParams, CookieTransport, OutboundCookie, SessionConfig, SessionPresence, SessionResult,
    SessionToken,
};
use tracing::{debug, info};

/// Request-scoped owner of the session token.
///
/// Holds the presence state for a single request; a new identity starts as
/// [`SessionPresence::NoSession`] and becomes active either by finding the inbound
/// cookie or by issuing a new token.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    cookie_key: String,
    cookie_params: CookieParams,
    id_prefix: String,
    presence: SessionPresence,
}

impl SessionIdentity {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_key: config.cookie_key.clone(),
            cookie_params: config.effective_cookie_params(),
            id_prefix: config.id_prefix.clone(),
            presence: SessionPresence::NoSession,
        }
    }

    pub fn presence(&self) -> &SessionPresence {
        &self.presence
    }

    pub fn cookie_key(&self) -> &str {
        &self.cookie_key
    }

    pub fn cookie_params(&self) -> &CookieParams {
        &self.cookie_params
    }

    /// Merge overrides into the parameters used for the next issued cookie
    pub fn set_cookie_params(&mut self, overrides: &CookieParams) {
        self.cookie_params.merge(overrides);
    }

    /// Whether a token is known, cached or sent by the client. Has no side effects.
    pub fn is_active<T: CookieTransport + ?Sized>(&self, transport: &T) -> SessionResult<bool> {
        if self.presence.is_active() {
            return Ok(true);
        }
        Ok(Self::inbound_token(&self.cookie_key, transport)?.is_some())
    }

    /// The session token, read from the inbound cookie if not cached yet.
    ///
    /// Never issues a token.
    pub fn id<T: CookieTransport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> SessionResult<Option<SessionToken>> {
        if let Some(token) = self.presence.token() {
            return Ok(Some(token.clone()));
        }

        let inbound = Self::inbound_token(&self.cookie_key, transport)?;
        if let Some(token) = &inbound {
            debug!(cookie = %self.cookie_key, "Adopted session token from inbound cookie");
            self.presence = SessionPresence::Active(token.clone());
        }
        Ok(inbound)
    }

    /// Adopt a token without touching the transport
    pub fn set_id(&mut self, token: SessionToken) {
        self.presence = SessionPresence::Active(token);
    }

    /// Make sure a token exists, issuing one with its cookie when needed.
    ///
    /// Idempotent: once active, no further tokens or cookies are produced.
    pub fn open<T: CookieTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> SessionResult<SessionToken> {
        if let Some(token) = self.id(&*transport)? {
            return Ok(token);
        }
        self.issue(transport)
    }

    /// Issue a fresh token and cookie unconditionally, replacing any cached token
    pub fn issue<T: CookieTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> SessionResult<SessionToken> {
        let token = self.generate();
        self.deliver(transport, token.clone())?;
        Ok(token)
    }

    /// A new token with the configured prefix. Nothing is cached or sent.
    pub fn generate(&self) -> SessionToken {
        SessionToken::generate(&self.id_prefix)
    }

    /// Send the cookie for `token`, then make it the cached token.
    ///
    /// The cached token is left untouched when the transport rejects the cookie.
    pub fn deliver<T: CookieTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        token: SessionToken,
    ) -> SessionResult<()> {
        let cookie = OutboundCookie::new(
            &self.cookie_key,
            token.as_str(),
            &self.cookie_params,
            Utc::now(),
        );
        let expires = cookie.expires;

        transport.add_cookie(cookie)?;
        self.presence = SessionPresence::Active(token);

        info!(cookie = %self.cookie_key, %expires, "Issued new session token");
        Ok(())
    }

    fn inbound_token<T: CookieTransport + ?Sized>(
        cookie_key: &str,
        transport: &T,
    ) -> SessionResult<Option<SessionToken>> {
        Ok(transport
            .inbound_cookie(cookie_key)?
            .filter(|value| !value.is_empty())
            .map(SessionToken::new))
    }
}
