//! Standalone cookie transports
//!
//! `MemoryTransport` serves hosts that move cookies themselves (and tests);
//! `DetachedTransport` stands in where no request context exists.

use persession_core::{transport_error, CookieTransport, OutboundCookie, SessionResult};
use std::collections::HashMap;

/// Cookie transport backed by plain maps
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inbound: HashMap<String, String>,
    outbound: Vec<OutboundCookie>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport for a request that carried the cookie `name=value`
    pub fn with_cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut transport = Self::new();
        transport.inbound.insert(name.into(), value.into());
        transport
    }

    /// Cookies scheduled for the response so far
    pub fn outbound(&self) -> &[OutboundCookie] {
        &self.outbound
    }

    pub fn take_outbound(&mut self) -> Vec<OutboundCookie> {
        std::mem::take(&mut self.outbound)
    }
}

impl CookieTransport for MemoryTransport {
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>> {
        Ok(self.inbound.get(name).cloned())
    }

    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()> {
        self.outbound.push(cookie);
        Ok(())
    }
}

/// Transport for code running outside any request, e.g. background jobs.
///
/// Every cookie access fails with `TransportUnavailable`; sessions driven through it
/// must have their token adopted with `set_id` first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedTransport;

impl CookieTransport for DetachedTransport {
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>> {
        Err(transport_error!(
            format!("Cannot read cookie '{}' outside a request", name),
            "detached_transport"
        ))
    }

    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()> {
        Err(transport_error!(
            format!("Cannot deliver cookie '{}' outside a request", cookie.name),
            "detached_transport"
        ))
    }
}
