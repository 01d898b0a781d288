//! Error types for the bililink crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the bililink crates.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Every variant is meant to
/// surface as a user-visible message at the boundary of the action that
/// triggered it; none of them are fatal to the process.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LinkError {
    /// A required input is missing or malformed; corrected by the user.
    #[error("{0}")]
    Validation(String),

    /// The anti-forgery token could not be read from the host session.
    /// Corrected by re-authenticating in the host page.
    #[error("anti-forgery token missing; sign in to Bilibili first")]
    MissingCredential,

    /// Network-level failure (connect, timeout, non-2xx status).
    /// Transient; the same action may be retried by the user.
    #[error("network request failed: {0}")]
    Transport(String),

    /// The platform rejected the request with an application-level code.
    /// The message is shown verbatim.
    #[error("{message}")]
    Application { message: String },

    /// The category taxonomy could not be fetched or was malformed.
    #[error("area list unavailable: {0}")]
    TaxonomyUnavailable(String),

    /// Persistence layer failure (key/value store access).
    #[error("store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },
}

impl LinkError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an Application error carrying the platform's message text
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Creates a TaxonomyUnavailable error
    pub fn taxonomy_unavailable(message: impl Into<String>) -> Self {
        Self::TaxonomyUnavailable(message.into())
    }

    /// Creates a Store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is an Application error
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Check if this is a MissingCredential error
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for LinkError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, LinkError>`.
pub type Result<T> = std::result::Result<T, LinkError>;
