//! Persession Store - cookie-addressed sessions persisted in a document store
//!
//! This crate ties the two halves of a session together:
//!
//! - **Identity** ([`SessionIdentity`]): finds the session token in the inbound
//!   cookie or issues a new one, once per request
//! - **Records** ([`RecordStore`]): one document per token, modified through sparse
//!   field updates
//!
//! [`SessionManager`] is shared across requests and hands out a [`Session`] per
//! request, which combines both halves behind the session operations.
//!
//! ```rust,ignore
//! let manager = SessionManager::connect(&config).await?;
//!
//! let mut session = manager.session(transport);
//! session.set("cart", vec![1, 2, 3]).await?;
//! let theme = session.get_or("theme", "light").await?;
//! let transport = session.into_transport(); // carries the Set-Cookie, if any
//! ```

pub mod backend;
pub mod identity;
pub mod manager;
pub mod record;
pub mod session;
pub mod transport;

pub use backend::MemoryDocumentStore;
#[cfg(feature = "sqlite")]
pub use backend::SqliteDocumentStore;
pub use identity::SessionIdentity;
pub use manager::SessionManager;
pub use record::RecordStore;
pub use session::Session;
pub use transport::{DetachedTransport, MemoryTransport};

pub use persession_core::{
    CookieParams, CookieTransport, DestroyPolicy, Document, DocumentStore, OutboundCookie,
    PersessionConfig, SessionConfig, SessionError, SessionPresence, SessionResult, SessionToken,
};
