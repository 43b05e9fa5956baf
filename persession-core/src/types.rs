//! Core data type definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of the primary key field of every session record
pub const PRIMARY_KEY: &str = "_id";

/// Cookie lifetime used when none is configured (five years)
pub const DEFAULT_COOKIE_LIFETIME_SECS: u64 = 3600 * 24 * 365 * 5;

/// Longest accepted cookie lifetime (100 years)
pub const MAX_COOKIE_LIFETIME_SECS: u64 = 3600 * 24 * 365 * 100;

/// A sparse document as stored in a collection
pub type Document = serde_json::Map<String, Value>;

/// Opaque token identifying one session, also the primary key of its record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh unpredictable token, optionally prefixed
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}{}", prefix, uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether a request currently has an established session identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionPresence {
    #[default]
    NoSession,
    Active(SessionToken),
}

impl SessionPresence {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPresence::Active(_))
    }

    pub fn token(&self) -> Option<&SessionToken> {
        match self {
            SessionPresence::Active(token) => Some(token),
            SessionPresence::NoSession => None,
        }
    }
}

/// One stored session: the primary key plus the user fields
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionToken,
    pub fields: Document,
}

impl SessionRecord {
    pub fn new(id: SessionToken) -> Self {
        Self {
            id,
            fields: Document::new(),
        }
    }

    /// Split a raw document into primary key and user fields.
    ///
    /// Returns `None` when the document has no string primary key.
    pub fn from_document(mut document: Document) -> Option<Self> {
        let id = match document.remove(PRIMARY_KEY) {
            Some(Value::String(id)) => SessionToken::new(id),
            _ => return None,
        };
        Some(Self {
            id,
            fields: document,
        })
    }

    /// Rebuild the raw document, primary key included
    pub fn into_document(self) -> Document {
        let mut document = Document::new();
        document.insert(PRIMARY_KEY.to_string(), Value::String(self.id.into_inner()));
        document.extend(self.fields);
        document
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of user fields, the primary key excluded
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Partial modification of a single record
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set or overwrite the given fields, leaving the others untouched
    Set(Document),
    /// Remove the named fields if present
    Unset(Vec<String>),
}

impl UpdateOp {
    /// Apply the operation to a document in place
    pub fn apply(self, document: &mut Document) {
        match self {
            UpdateOp::Set(fields) => {
                for (key, value) in fields {
                    document.insert(key, value);
                }
            }
            UpdateOp::Unset(keys) => {
                for key in keys {
                    document.remove(&key);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Transport attributes of the session cookie.
///
/// Every attribute is optional so that overrides can be layered with [`CookieParams::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieParams {
    /// Lifetime in seconds from the moment the cookie is issued
    pub lifetime: Option<u64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
}

impl Default for CookieParams {
    fn default() -> Self {
        Self {
            lifetime: None,
            path: Some("/".to_string()),
            domain: None,
            secure: Some(true),
            http_only: Some(true),
            same_site: None,
        }
    }
}

impl CookieParams {
    /// Parameters with no attribute set, useful as a base for overrides
    pub fn empty() -> Self {
        Self {
            lifetime: None,
            path: None,
            domain: None,
            secure: None,
            http_only: None,
            same_site: None,
        }
    }

    /// Overlay every attribute that `overrides` sets
    pub fn merge(&mut self, overrides: &CookieParams) {
        if overrides.lifetime.is_some() {
            self.lifetime = overrides.lifetime;
        }
        if overrides.path.is_some() {
            self.path = overrides.path.clone();
        }
        if overrides.domain.is_some() {
            self.domain = overrides.domain.clone();
        }
        if overrides.secure.is_some() {
            self.secure = overrides.secure;
        }
        if overrides.http_only.is_some() {
            self.http_only = overrides.http_only;
        }
        if overrides.same_site.is_some() {
            self.same_site = overrides.same_site;
        }
    }

    pub fn merged(mut self, overrides: &CookieParams) -> Self {
        self.merge(overrides);
        self
    }

    /// Absolute expiry for a cookie issued at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = self
            .lifetime
            .unwrap_or(DEFAULT_COOKIE_LIFETIME_SECS)
            .min(MAX_COOKIE_LIFETIME_SECS);
        let lifetime = i64::try_from(lifetime).unwrap_or(i64::MAX);
        Duration::try_seconds(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A fully resolved cookie ready to hand to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl OutboundCookie {
    pub fn new(name: &str, value: &str, params: &CookieParams, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: params.expires_at(now),
            path: params.path.clone(),
            domain: params.domain.clone(),
            secure: params.secure.unwrap_or(true),
            http_only: params.http_only.unwrap_or(true),
            same_site: params.same_site,
        }
    }
}
