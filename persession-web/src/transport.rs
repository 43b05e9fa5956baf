//! Cookie transport over the axum-extra cookie jar

use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite as JarSameSite};
use persession_core::{
    transport_error, CookieTransport, OutboundCookie, SameSite, SessionResult,
};
use std::convert::Infallible;
use time::OffsetDateTime;

/// Request cookies in, `Set-Cookie` headers out.
///
/// Returned from a handler (directly or through [`crate::WebSession`]) it writes every
/// cookie the session issued into the response.
#[derive(Debug, Clone, Default)]
pub struct JarTransport {
    jar: CookieJar,
}

impl JarTransport {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl CookieTransport for JarTransport {
    fn inbound_cookie(&self, name: &str) -> SessionResult<Option<String>> {
        Ok(self.jar.get(name).map(|cookie| cookie.value().to_string()))
    }

    fn add_cookie(&mut self, cookie: OutboundCookie) -> SessionResult<()> {
        let cookie = to_jar_cookie(cookie)?;
        self.jar = std::mem::take(&mut self.jar).add(cookie);
        Ok(())
    }
}

impl IntoResponseParts for JarTransport {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}

fn to_jar_cookie(cookie: OutboundCookie) -> SessionResult<Cookie<'static>> {
    let expires = OffsetDateTime::from_unix_timestamp(cookie.expires.timestamp()).map_err(|e| {
        transport_error!(
            format!("Cookie expiry out of range: {}", e),
            "jar_transport"
        )
    })?;

    let mut builder = Cookie::build((cookie.name, cookie.value))
        .secure(cookie.secure)
        .http_only(cookie.http_only)
        .expires(expires);

    if let Some(path) = cookie.path {
        builder = builder.path(path);
    }
    if let Some(domain) = cookie.domain {
        builder = builder.domain(domain);
    }
    if let Some(same_site) = cookie.same_site {
        builder = builder.same_site(match same_site {
            SameSite::Strict => JarSameSite::Strict,
            SameSite::Lax => JarSameSite::Lax,
            SameSite::None => JarSameSite::None,
        });
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use persession_core::CookieParams;

    #[test]
    fn test_reads_inbound_cookie() {
        let jar = CookieJar::new().add(Cookie::new("session-id", "abc123"));
        let transport = JarTransport::new(jar);

        assert_eq!(
            transport.inbound_cookie("session-id").unwrap().as_deref(),
            Some("abc123")
        );
        assert_eq!(transport.inbound_cookie("other").unwrap(), None);
    }

    #[test]
    fn test_outbound_cookie_attributes() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let params = CookieParams {
            domain: Some("example.com".to_string()),
            same_site: Some(SameSite::Lax),
            ..CookieParams::default()
        };
        let mut transport = JarTransport::default();

        transport
            .add_cookie(OutboundCookie::new("session-id", "abc123", &params, now))
            .unwrap();

        let jar = transport.into_jar();
        let cookie = jar.get("session-id").unwrap();
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(JarSameSite::Lax));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.year()),
            Some(2028)
        );
    }
}
