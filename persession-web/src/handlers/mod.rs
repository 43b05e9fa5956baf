//! HTTP request handlers for the persession web server

pub mod health;
pub mod session;
pub mod types;

pub use health::*;
pub use session::*;
pub use types::*;
