//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};

pub type SessionResult<T> = Result<T, SessionError>;

/// Where and while doing what an error happened, plus hints for the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Id to correlate the error across log lines
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    /// Component that raised the error, e.g. `sqlite_store`
    pub component: String,
    pub operation: Option<String>,
    /// Structured details such as the collection involved
    pub metadata: BTreeMap<String, String>,
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            component: component.into(),
            operation: None,
            metadata: BTreeMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Attach a structured detail, replacing any previous value for `key`
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }
}

/// Main error type for session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid or unreachable configuration, surfaced at startup
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The cookie transport is not usable in the current execution context
    #[error("Cookie transport unavailable: {message}")]
    TransportUnavailable {
        message: String,
        context: ErrorContext,
    },

    /// Any failure reported by the document database
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// A write collided with an existing record (primary key uniqueness)
    #[error("Storage conflict: {message}")]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SessionError::Config { context, .. } => Some(context),
            SessionError::TransportUnavailable { context, .. } => Some(context),
            SessionError::Storage { context, .. } => Some(context),
            SessionError::Conflict { context, .. } => Some(context),
            SessionError::Validation { context, .. } => Some(context),
            SessionError::Io(_) | SessionError::Serialization(_) => None,
        }
    }

    /// Whether the failure came from the document database
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SessionError::Storage { .. } | SessionError::Conflict { .. }
        )
    }

    /// Whether the failure is a primary key collision
    pub fn is_conflict(&self) -> bool {
        matches!(self, SessionError::Conflict { .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            SessionError::Config { .. } | SessionError::TransportUnavailable { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or transport error"
                );
            }
            SessionError::Conflict { .. } | SessionError::Validation { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Rejected session write"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::SessionError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SessionError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::SessionError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SessionError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::SessionError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr, $component:expr) => {
        $crate::SessionError::TransportUnavailable {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Session operations need an active request context"),
        }
    };
}
