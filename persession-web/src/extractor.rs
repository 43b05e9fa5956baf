//! Request extractor handing each handler its own session

use crate::{transport::JarTransport, AppState};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use persession_store::Session;
use std::convert::Infallible;
use std::ops::{Deref, DerefMut};

/// Session bound to the cookies of the current request.
///
/// Handlers must return [`WebSession::finish`] (or the transport) as part of the
/// response, otherwise a newly issued cookie never reaches the client.
pub struct WebSession(Session<JarTransport>);

impl WebSession {
    /// Response part carrying the cookies issued during the request
    pub fn finish(self) -> JarTransport {
        self.0.into_transport()
    }
}

impl Deref for WebSession {
    type Target = Session<JarTransport>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for WebSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromRequestParts<AppState> for WebSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Self(state.sessions.session(JarTransport::new(jar))))
    }
}
