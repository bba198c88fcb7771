//! Error types for Clouditor
//!
//! This module defines the error hierarchy for the whole service.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Transport layers never inspect variants directly; they go through
//! [`Error::kind`] so that the mapping to status codes lives in one place.

use thiserror::Error;

/// The main error type for Clouditor
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error("Malformed page token: {message}")]
    MalformedPageToken { message: String },

    #[error("Invalid order column: {column}")]
    InvalidOrderColumn { column: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ============================================================================
    // Access Errors
    // ============================================================================
    /// The display text is fixed; the reason for the denial is never disclosed.
    #[error("access denied")]
    PermissionDenied,

    #[error("invalid auth token")]
    Unauthenticated,

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Database error: {message}")]
    Store { message: String },

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Request cancelled")]
    Cancelled,

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`], used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    PermissionDenied,
    Unauthenticated,
    NotFound,
    DeadlineExceeded,
    Cancelled,
    Internal,
}

impl Error {
    /// Create a malformed page token error
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedPageToken {
            message: message.into(),
        }
    }

    /// Create an invalid order column error
    pub fn invalid_order_column(column: impl Into<String>) -> Self {
        Self::InvalidOrderColumn {
            column: column.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a storage error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedPageToken { .. }
            | Error::InvalidOrderColumn { .. }
            | Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::PermissionDenied => ErrorKind::PermissionDenied,
            Error::Unauthenticated => ErrorKind::Unauthenticated,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Store { .. }
            | Error::Config { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_)
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller sent something we refuse to process
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

/// Result type alias for Clouditor
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
