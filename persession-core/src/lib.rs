//! Persession Core - Core data structures and trait definitions
//!
//! Defines the session data model, the collaborator traits (document store and
//! cookie transport), the error type, configuration and logging shared by the
//! other persession crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
